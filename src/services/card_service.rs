use uuid::Uuid;

use super::api::ApiClient;
use crate::error::AppResult;
use crate::models::{ActivateCardRequest, Card, UpdateCardRequest};

/// Card operations available to the card owner.
#[derive(Clone)]
pub struct CardService {
    api: ApiClient,
}

impl CardService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn my_cards(&self, token: &str) -> AppResult<Vec<Card>> {
        self.api.get("/cards/mine", Some(token)).await
    }

    pub async fn update_card(&self, token: &str, id: Uuid, req: &UpdateCardRequest) -> AppResult<Card> {
        self.api.patch(&format!("/cards/{}", id), req, Some(token)).await
    }

    /// Ask the upstream to bind the physical tag `uid` to the card and switch it on.
    pub async fn activate(&self, token: &str, id: Uuid, uid: &str) -> AppResult<Card> {
        let req = ActivateCardRequest { uid: uid.to_string() };
        self.api.post(&format!("/cards/{}/activate", id), &req, Some(token)).await
    }
}
