use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Active,
    Inactive,
    Pending,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Active => "active",
            CardStatus::Inactive => "inactive",
            CardStatus::Pending => "pending",
        }
    }

    /// A card can be switched on and off freely but never returns to `pending`.
    pub fn can_transition_to(&self, next: CardStatus) -> bool {
        *self != next && next != CardStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardOwner {
    pub id: Uuid,
    pub name: String,
}

/// A physical NFC card and the review page it points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub uid: String,
    pub status: CardStatus,
    pub business_name: String,
    #[serde(default)]
    pub google_review_link: Option<String>,
    #[serde(default)]
    pub owner: Option<CardOwner>,
    #[serde(default)]
    pub scan_count: u64,
    #[serde(default)]
    pub review_count: u64,
    #[serde(default)]
    pub region: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_review_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateCardRequest {
    pub uid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCardStatusRequest {
    pub status: CardStatus,
}
