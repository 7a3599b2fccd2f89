//! Sign-in, registration and profile lookups against the upstream API.

use tracing::info;

use super::api::ApiClient;
use crate::error::{AppError, AppResult};
use crate::models::{AuthSession, LoginRequest, RegisterRequest, User};

#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn login(&self, req: &LoginRequest) -> AppResult<AuthSession> {
        let session: AuthSession = self.api.post("/auth/login", req, None).await?;
        info!("User {} signed in as {}", session.user.id, session.user.role.as_str());
        Ok(session)
    }

    pub async fn register(&self, req: &RegisterRequest) -> AppResult<AuthSession> {
        let session: AuthSession = self.api.post("/auth/register", req, None).await?;
        info!("User {} registered", session.user.id);
        Ok(session)
    }

    /// Resolve the profile behind `token`. A token the upstream rejects is
    /// treated as anonymous rather than as an error.
    pub async fn me(&self, token: &str) -> AppResult<Option<User>> {
        match self.api.get::<User>("/auth/me", Some(token)).await {
            Ok(user) => Ok(Some(user)),
            Err(AppError::Unauthorized) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn logout(&self, token: &str) -> AppResult<()> {
        match self.api.post_empty("/auth/logout", Some(token)).await {
            // Already expired upstream, nothing left to revoke
            Err(AppError::Unauthorized) => Ok(()),
            other => other,
        }
    }
}
