//! # Checkout Wizard
//!
//! A five-step linear flow: `plan -> shipping -> payment -> review ->
//! confirmation`. [`CheckoutDraft`] holds the wizard state and enforces
//! which edits are allowed at which step; [`CheckoutService`] drives the
//! upstream calls (plan lookup, promo validation, quoting, order creation,
//! PayPal capture) and persists drafts through a [`CheckoutStore`].
//!
//! Once an upstream order exists the draft is locked: only `place_order`
//! may be retried, so a failed capture never produces a second order.

pub mod service;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{CreateOrderRequest, Order, PaymentMethod, Plan, Quote, QuoteRequest, ShippingAddress, ShippingMethod};
use crate::validation;

pub use service::CheckoutService;
pub use store::{spawn_sweeper, CheckoutStore, MemoryCheckoutStore, PgCheckoutStore};

pub const MAX_QUANTITY: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStep {
    Plan,
    Shipping,
    Payment,
    Review,
    Confirmation,
}

impl CheckoutStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::Plan => "plan",
            CheckoutStep::Shipping => "shipping",
            CheckoutStep::Payment => "payment",
            CheckoutStep::Review => "review",
            CheckoutStep::Confirmation => "confirmation",
        }
    }

    fn previous(&self) -> Option<CheckoutStep> {
        match self {
            CheckoutStep::Plan | CheckoutStep::Confirmation => None,
            CheckoutStep::Shipping => Some(CheckoutStep::Plan),
            CheckoutStep::Payment => Some(CheckoutStep::Shipping),
            CheckoutStep::Review => Some(CheckoutStep::Payment),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedPlan {
    pub plan_id: String,
    pub plan_name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub address: ShippingAddress,
    pub method: ShippingMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDraft {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub step: CheckoutStep,
    pub plan: Option<SelectedPlan>,
    pub shipping: Option<ShippingDetails>,
    pub payment_method: Option<PaymentMethod>,
    pub promo_code: Option<String>,
    pub quote: Option<Quote>,
    pub order: Option<Order>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CheckoutDraft {
    pub fn new(owner_id: Option<Uuid>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            step: CheckoutStep::Plan,
            plan: None,
            shipping: None,
            payment_method: None,
            promo_code: None,
            quote: None,
            order: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn ensure_editable(&self, action: &'static str) -> AppResult<()> {
        if self.step == CheckoutStep::Confirmation || self.order.is_some() {
            return Err(AppError::InvalidStep {
                action,
                step: self.step.as_str(),
            });
        }
        Ok(())
    }

    /// `done` is whether the prerequisite answer has been given.
    fn ensure_answered(&self, done: bool, action: &'static str) -> AppResult<()> {
        if !done {
            return Err(AppError::InvalidStep {
                action,
                step: self.step.as_str(),
            });
        }
        Ok(())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub fn select_plan(&mut self, plan: &Plan, quantity: u32, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_editable("select a plan")?;
        if !(1..=MAX_QUANTITY).contains(&quantity) {
            return Err(AppError::field(
                "quantity",
                format!("Quantity must be between 1 and {}", MAX_QUANTITY),
            ));
        }
        self.plan = Some(SelectedPlan {
            plan_id: plan.id.clone(),
            plan_name: plan.name.clone(),
            quantity,
            unit_price: plan.price,
            currency: plan.currency.clone(),
        });
        self.quote = None;
        self.step = CheckoutStep::Shipping;
        self.touch(now);
        Ok(())
    }

    pub fn set_shipping(&mut self, details: ShippingDetails, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_editable("set shipping")?;
        self.ensure_answered(self.plan.is_some(), "set shipping")?;
        validation::validate_shipping(&details.address)?;
        self.shipping = Some(details);
        self.quote = None;
        self.step = CheckoutStep::Payment;
        self.touch(now);
        Ok(())
    }

    pub fn set_payment(&mut self, method: PaymentMethod, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_editable("choose a payment method")?;
        self.ensure_answered(self.shipping.is_some(), "choose a payment method")?;
        self.payment_method = Some(method);
        self.step = CheckoutStep::Review;
        self.touch(now);
        Ok(())
    }

    pub fn apply_promo(&mut self, code: String, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_editable("apply a promo code")?;
        self.promo_code = Some(code);
        self.quote = None;
        self.touch(now);
        Ok(())
    }

    pub fn remove_promo(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_editable("remove the promo code")?;
        self.promo_code = None;
        self.quote = None;
        self.touch(now);
        Ok(())
    }

    pub fn back(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_editable("go back")?;
        let previous = self.step.previous().ok_or(AppError::InvalidStep {
            action: "go back",
            step: self.step.as_str(),
        })?;
        self.step = previous;
        self.touch(now);
        Ok(())
    }

    pub fn quote_request(&self) -> AppResult<QuoteRequest> {
        let (plan, shipping) = match (&self.plan, &self.shipping) {
            (Some(plan), Some(shipping)) => (plan, shipping),
            _ => {
                return Err(AppError::InvalidStep {
                    action: "request a quote",
                    step: self.step.as_str(),
                })
            }
        };
        Ok(QuoteRequest {
            plan_id: plan.plan_id.clone(),
            quantity: plan.quantity,
            promo_code: self.promo_code.clone(),
            shipping_method: shipping.method,
            country: shipping.address.country.clone(),
        })
    }

    pub fn order_request(&self) -> AppResult<CreateOrderRequest> {
        match (&self.plan, &self.shipping, self.payment_method) {
            (Some(plan), Some(shipping), Some(payment_method)) if self.step == CheckoutStep::Review => {
                Ok(CreateOrderRequest {
                    plan_id: plan.plan_id.clone(),
                    quantity: plan.quantity,
                    shipping_address: shipping.address.clone(),
                    shipping_method: shipping.method,
                    payment_method,
                    promo_code: self.promo_code.clone(),
                })
            }
            _ => Err(AppError::InvalidStep {
                action: "place the order",
                step: self.step.as_str(),
            }),
        }
    }

    /// Remember the upstream order so a retry reuses it.
    pub fn record_order(&mut self, order: Order, now: DateTime<Utc>) {
        self.order = Some(order);
        self.touch(now);
    }

    pub fn complete(&mut self, order: Order, now: DateTime<Utc>) {
        self.order = Some(order);
        self.step = CheckoutStep::Confirmation;
        self.touch(now);
    }
}
