//! Sign-in routes.
//!
//! POST /auth/login    - Exchange credentials for a token (also set as cookie)
//! POST /auth/register - Create an account and sign in
//! POST /auth/logout   - Revoke the token upstream and clear the cookie
//! GET  /auth/me       - Current profile (authenticated)

use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use tracing::{error, info};

use crate::error::AppResult;
use crate::guard::{self, CurrentUser};
use crate::models::{ApiResponse, AuthSession, LoginRequest, RegisterRequest, User};
use crate::state::AppState;
use crate::validation;

/// Build the auth router.
pub fn router() -> Router {
    Router::new()
        .route("/auth/me", get(me))
        .route_layer(middleware::from_fn(guard::require_authenticated))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
}

async fn login(
    Extension(state): Extension<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    validation::validate_login(&req)?;
    let session = state.auth.login(&req).await?;
    let cookie = guard::session_cookie(&session.token, state.settings.cookie_secure);

    Ok((
        [(SET_COOKIE, cookie)],
        Json(ApiResponse::new(session, "Signed in")),
    ))
}

async fn register(
    Extension(state): Extension<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    validation::validate_registration(&req)?;
    let session: AuthSession = state.auth.register(&req).await?;
    let cookie = guard::session_cookie(&session.token, state.settings.cookie_secure);

    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        Json(ApiResponse::new(session, "Account created")),
    ))
}

/// The cookie is cleared even when the upstream revocation fails.
async fn logout(Extension(state): Extension<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = guard::bearer_token(&headers) {
        match state.auth.logout(&token).await {
            Ok(()) => info!("Session signed out"),
            Err(e) => error!("Upstream logout failed, clearing the cookie anyway: {}", e),
        }
    }

    (
        [(SET_COOKIE, guard::cleared_cookie())],
        Json(ApiResponse::new((), "Signed out")),
    )
}

async fn me(current: CurrentUser) -> Json<ApiResponse<User>> {
    Json(ApiResponse::new(current.user, "Current user"))
}
