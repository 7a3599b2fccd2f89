use super::api::ApiClient;
use crate::error::AppResult;
use crate::models::{Commission, CreatePromoCodeRequest, PromoCode, UpdatePromoCodeRequest};

/// Calls scoped to the signed-in promoter; the upstream derives the promoter
/// from the token.
#[derive(Clone)]
pub struct PromoterService {
    api: ApiClient,
}

impl PromoterService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn codes(&self, token: &str) -> AppResult<Vec<PromoCode>> {
        self.api.get("/promoter/codes", Some(token)).await
    }

    pub async fn create_code(&self, token: &str, req: &CreatePromoCodeRequest) -> AppResult<PromoCode> {
        self.api.post("/promoter/codes", req, Some(token)).await
    }

    pub async fn set_code_active(&self, token: &str, code: &str, active: bool) -> AppResult<PromoCode> {
        let req = UpdatePromoCodeRequest { active };
        self.api.patch(&format!("/promoter/codes/{}", code), &req, Some(token)).await
    }

    pub async fn commissions(&self, token: &str) -> AppResult<Vec<Commission>> {
        self.api.get("/promoter/commissions", Some(token)).await
    }
}
