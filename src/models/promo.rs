//! Promoter-facing models: discount codes, commissions and the admin view of
//! a promoter's performance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::round_cents;
use super::user::UserStatus;

// ============================================================================
// Promo Codes
// ============================================================================

/// Discount granted by a promo code.
///
/// Serialized as `{"type": "percentage", "value": 10.0}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Discount {
    Percentage(f64),
    Fixed(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    pub code: String,
    pub discount: Discount,
    #[serde(default)]
    pub usage: u32,
    #[serde(default)]
    pub max_usage: Option<u32>,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    pub active: bool,
    #[serde(default)]
    pub promoter_id: Option<Uuid>,
}

impl PromoCode {
    /// Whether the code can still be applied at `now`.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.valid_from.map_or(true, |from| now >= from)
            && self.valid_until.map_or(true, |until| now <= until)
            && self.max_usage.map_or(true, |max| self.usage < max)
    }

    /// Discount this code would take off `amount`, for display only.
    pub fn discount_on(&self, amount: f64) -> f64 {
        let raw = match self.discount {
            Discount::Percentage(pct) => amount * pct / 100.0,
            Discount::Fixed(value) => value,
        };
        round_cents(raw.clamp(0.0, amount.max(0.0)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromoCodeRequest {
    pub code: String,
    pub discount: Discount,
    #[serde(default)]
    pub max_usage: Option<u32>,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePromoCodeRequest {
    pub active: bool,
}

// ============================================================================
// Commissions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    Pending,
    Paid,
    Cancelled,
}

impl CommissionStatus {
    pub const ALL: [CommissionStatus; 3] = [
        CommissionStatus::Pending,
        CommissionStatus::Paid,
        CommissionStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "pending",
            CommissionStatus::Paid => "paid",
            CommissionStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: CommissionStatus) -> bool {
        *self == CommissionStatus::Pending && next != CommissionStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commission {
    pub id: Uuid,
    pub order_id: Uuid,
    #[serde(default)]
    pub order_number: Option<String>,
    pub promoter_id: Uuid,
    pub amount: f64,
    pub status: CommissionStatus,
    #[serde(default)]
    pub region: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCommissionStatusRequest {
    pub status: CommissionStatus,
}

// ============================================================================
// Promoter (admin view)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promoter {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub region: Option<String>,
    pub status: UserStatus,
    pub commission_rate: f64,
    #[serde(default)]
    pub code_count: u32,
    #[serde(default)]
    pub total_sales: f64,
    #[serde(default)]
    pub total_commission: f64,
}
