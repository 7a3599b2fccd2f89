//! Upstream-facing side of the checkout wizard.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{CheckoutDraft, CheckoutStep, CheckoutStore, ShippingDetails};
use crate::error::{AppError, AppResult};
use crate::guard::CurrentUser;
use crate::models::{Order, PaymentMethod, PaymentStatus};
use crate::services::OrderService;
use crate::validation;

/// Seconds an unreleased placement claim blocks other attempts.
const PLACE_CLAIM_TIMEOUT_SECS: i64 = 120;

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn CheckoutStore>,
    orders: OrderService,
    ttl: chrono::Duration,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn CheckoutStore>, orders: OrderService, ttl: Duration) -> AppResult<Self> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| AppError::Internal(e.into()))?;
        Ok(Self { store, orders, ttl })
    }

    pub fn store(&self) -> Arc<dyn CheckoutStore> {
        self.store.clone()
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    pub async fn start(&self, caller: Option<&CurrentUser>) -> AppResult<CheckoutDraft> {
        let draft = CheckoutDraft::new(caller.map(|c| c.user.id), Utc::now());
        self.store.insert(&draft).await?;
        info!("Checkout draft {} started", draft.id);
        Ok(draft)
    }

    /// Load a live draft the caller may see. Expired drafts read as missing;
    /// another user's draft is forbidden.
    pub async fn load(&self, id: Uuid, caller: Option<&CurrentUser>) -> AppResult<CheckoutDraft> {
        let draft = self
            .store
            .get(id)
            .await?
            .filter(|d| d.updated_at >= Utc::now() - self.ttl)
            .ok_or_else(|| AppError::NotFound(format!("checkout draft {}", id)))?;

        if let Some(owner) = draft.owner_id {
            if caller.map(|c| c.user.id) != Some(owner) {
                warn!("Checkout draft {} requested by non-owner", id);
                return Err(AppError::Forbidden("checkout belongs to another account".to_string()));
            }
        }
        Ok(draft)
    }

    pub async fn select_plan(
        &self,
        id: Uuid,
        caller: Option<&CurrentUser>,
        plan_id: &str,
        quantity: u32,
    ) -> AppResult<CheckoutDraft> {
        let mut draft = self.load(id, caller).await?;
        let plan = match self.orders.plan(plan_id).await {
            Err(AppError::NotFound(_)) => return Err(AppError::field("planId", "Unknown plan")),
            other => other?,
        };
        draft.select_plan(&plan, quantity, Utc::now())?;
        self.store.save(&draft).await?;
        Ok(draft)
    }

    pub async fn set_shipping(
        &self,
        id: Uuid,
        caller: Option<&CurrentUser>,
        details: ShippingDetails,
    ) -> AppResult<CheckoutDraft> {
        let mut draft = self.load(id, caller).await?;
        draft.set_shipping(details, Utc::now())?;
        self.store.save(&draft).await?;
        Ok(draft)
    }

    /// Choose the payment method and price the order for the review step.
    pub async fn set_payment(
        &self,
        id: Uuid,
        caller: Option<&CurrentUser>,
        method: PaymentMethod,
    ) -> AppResult<CheckoutDraft> {
        let mut draft = self.load(id, caller).await?;
        draft.set_payment(method, Utc::now())?;
        self.requote(&mut draft, caller).await?;
        self.store.save(&draft).await?;
        Ok(draft)
    }

    pub async fn apply_promo(&self, id: Uuid, caller: Option<&CurrentUser>, code: &str) -> AppResult<CheckoutDraft> {
        let code = code.trim().to_ascii_uppercase();
        if !validation::is_promo_code(&code) {
            return Err(AppError::field("promoCode", "Promo code is malformed"));
        }

        let mut draft = self.load(id, caller).await?;
        let promo = match self.orders.promo_code(&code).await {
            Err(AppError::NotFound(_)) => return Err(AppError::field("promoCode", "Unknown promo code")),
            other => other?,
        };
        if !promo.is_redeemable(Utc::now()) {
            return Err(AppError::field("promoCode", "Promo code is no longer valid"));
        }

        draft.apply_promo(promo.code, Utc::now())?;
        if draft.step == CheckoutStep::Review {
            self.requote(&mut draft, caller).await?;
        }
        self.store.save(&draft).await?;
        Ok(draft)
    }

    pub async fn remove_promo(&self, id: Uuid, caller: Option<&CurrentUser>) -> AppResult<CheckoutDraft> {
        let mut draft = self.load(id, caller).await?;
        draft.remove_promo(Utc::now())?;
        if draft.step == CheckoutStep::Review {
            self.requote(&mut draft, caller).await?;
        }
        self.store.save(&draft).await?;
        Ok(draft)
    }

    pub async fn back(&self, id: Uuid, caller: Option<&CurrentUser>) -> AppResult<CheckoutDraft> {
        let mut draft = self.load(id, caller).await?;
        draft.back(Utc::now())?;
        self.store.save(&draft).await?;
        Ok(draft)
    }

    /// Create the upstream order (once) and capture PayPal payments.
    ///
    /// Concurrent attempts on the same draft are refused with a conflict
    /// while one is in flight.
    pub async fn place_order(
        &self,
        id: Uuid,
        caller: Option<&CurrentUser>,
        paypal_order_id: Option<&str>,
    ) -> AppResult<CheckoutDraft> {
        let draft = self.load(id, caller).await?;

        let now = Utc::now();
        if !self.store.claim(id, now, now - chrono::Duration::seconds(PLACE_CLAIM_TIMEOUT_SECS)).await? {
            warn!("Checkout draft {} is already being placed", id);
            return Err(AppError::Conflict("this checkout is already being placed".to_string()));
        }

        let result = self.place_claimed(draft, caller, paypal_order_id).await;
        if let Err(e) = self.store.release(id).await {
            error!("Failed to release placement claim on draft {}: {}", id, e);
        }
        result
    }

    async fn place_claimed(
        &self,
        mut draft: CheckoutDraft,
        caller: Option<&CurrentUser>,
        paypal_order_id: Option<&str>,
    ) -> AppResult<CheckoutDraft> {
        // Re-read under the claim so a request that lost the race sees the
        // winner's order.
        if let Some(latest) = self.store.get(draft.id).await? {
            draft = latest;
        }
        let request = draft.order_request()?;
        let token = caller.map(|c| c.token.as_str());

        let paypal_order_id = if request.payment_method.is_local() {
            None
        } else {
            match paypal_order_id.map(str::trim).filter(|pid| !pid.is_empty()) {
                Some(pid) => Some(pid),
                None => return Err(AppError::field("paypalOrderId", "PayPal approval is required")),
            }
        };

        let order = match draft.order.clone() {
            Some(existing) => existing,
            None => {
                self.requote(&mut draft, caller).await?;
                let order = self.orders.create_order(&request, token).await?;
                draft.record_order(order.clone(), Utc::now());
                self.store.save(&draft).await?;
                order
            }
        };

        let order = match paypal_order_id {
            Some(pid) if payment_status(&order) != Some(PaymentStatus::Captured) => {
                let captured = match self.orders.capture_paypal(order.id, pid, token).await {
                    Ok(captured) => captured,
                    Err(e) => {
                        error!("PayPal capture failed for order {}: {}", order.order_number, e);
                        return Err(e);
                    }
                };
                if payment_status(&captured) != Some(PaymentStatus::Captured) {
                    error!("PayPal capture declined for order {}", captured.order_number);
                    let number = captured.order_number.clone();
                    draft.record_order(captured, Utc::now());
                    self.store.save(&draft).await?;
                    return Err(AppError::PaymentDeclined(number));
                }
                captured
            }
            _ => order,
        };

        draft.complete(order, Utc::now());
        self.store.save(&draft).await?;
        info!("Checkout draft {} confirmed", draft.id);
        Ok(draft)
    }

    async fn requote(&self, draft: &mut CheckoutDraft, caller: Option<&CurrentUser>) -> AppResult<()> {
        let request = draft.quote_request()?;
        let quote = self.orders.quote(&request, caller.map(|c| c.token.as_str())).await?;
        draft.quote = Some(quote);
        Ok(())
    }
}

fn payment_status(order: &Order) -> Option<PaymentStatus> {
    order.payment.as_ref().map(|p| p.status)
}
