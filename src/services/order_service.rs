//! Catalog, quoting, order creation and payment capture.
//!
//! The checkout wizard drives these calls; guests may check out, so the
//! token is optional on the ordering endpoints.

use tracing::info;
use uuid::Uuid;

use super::api::ApiClient;
use crate::error::{AppError, AppResult};
use crate::models::{CapturePaymentRequest, CreateOrderRequest, Order, Plan, PromoCode, Quote, QuoteRequest};

#[derive(Clone)]
pub struct OrderService {
    api: ApiClient,
}

impl OrderService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn plans(&self) -> AppResult<Vec<Plan>> {
        self.api.get("/plans", None).await
    }

    pub async fn plan(&self, plan_id: &str) -> AppResult<Plan> {
        self.plans()
            .await?
            .into_iter()
            .find(|plan| plan.id == plan_id)
            .ok_or_else(|| AppError::NotFound(format!("plan '{}'", plan_id)))
    }

    pub async fn promo_code(&self, code: &str) -> AppResult<PromoCode> {
        self.api.get(&format!("/promo-codes/{}", code), None).await
    }

    pub async fn quote(&self, req: &QuoteRequest, token: Option<&str>) -> AppResult<Quote> {
        self.api.post("/orders/quote", req, token).await
    }

    pub async fn create_order(&self, req: &CreateOrderRequest, token: Option<&str>) -> AppResult<Order> {
        let order: Order = self.api.post("/orders", req, token).await?;
        info!("Order {} created for plan {}", order.order_number, req.plan_id);
        Ok(order)
    }

    /// Capture an approved PayPal order; returns the order with its updated payment.
    pub async fn capture_paypal(&self, order_id: Uuid, paypal_order_id: &str, token: Option<&str>) -> AppResult<Order> {
        let req = CapturePaymentRequest {
            order_id,
            paypal_order_id: paypal_order_id.to_string(),
        };
        let order: Order = self.api.post("/payments/paypal/capture", &req, token).await?;
        info!("Payment captured for order {}", order.order_number);
        Ok(order)
    }

    pub async fn my_orders(&self, token: &str) -> AppResult<Vec<Order>> {
        self.api.get("/orders/mine", Some(token)).await
    }

    pub async fn order(&self, token: &str, id: Uuid) -> AppResult<Order> {
        self.api.get(&format!("/orders/{}", id), Some(token)).await
    }
}
