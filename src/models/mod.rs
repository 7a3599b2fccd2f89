//! Domain models for the storefront gateway.
//!
//! These structs mirror the JSON documents exchanged with the upstream API
//! (camelCase on the wire) plus the envelope the gateway wraps its own
//! responses in. The gateway owns no invariants on them beyond the
//! transition pre-checks on the status enums.

pub mod card;
pub mod catalog;
pub mod order;
pub mod promo;
pub mod region;
pub mod user;

use serde::Serialize;

pub use card::{ActivateCardRequest, Card, CardOwner, CardStatus, UpdateCardRequest, UpdateCardStatusRequest};
pub use catalog::{Plan, Quote, QuoteRequest};
pub use order::{
    CapturePaymentRequest, CreateOrderRequest, Order, OrderCustomer, OrderItem, OrderPackage, OrderStatus,
    Payment, PaymentMethod, PaymentStatus, ShippingAddress, ShippingMethod, UpdateOrderStatusRequest,
};
pub use promo::{
    Commission, CommissionStatus, CreatePromoCodeRequest, Discount, PromoCode, Promoter,
    UpdateCommissionStatusRequest, UpdatePromoCodeRequest,
};
pub use region::{AssignAdminRequest, CreateRegionRequest, Region, UpdateRegionRequest};
pub use user::{
    AuthSession, LoginRequest, RegisterRequest, Role, UpdateUserRoleRequest, UpdateUserStatusRequest, User,
    UserStatus,
};

// ============================================================================
// Response Models
// ============================================================================

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
        }
    }
}

/// Round a money amount to whole cents.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
