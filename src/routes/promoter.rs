//! Promoter console routes.
//!
//! GET   /promoter/dashboard     - Earnings and code usage
//! GET   /promoter/codes         - Own discount codes
//! POST  /promoter/codes         - Create a discount code
//! PATCH /promoter/codes/{code}  - Enable or disable a code
//! GET   /promoter/commissions   - Own commissions

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, patch};
use axum::{Extension, Json, Router};
use chrono::Utc;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::filters::{self, Page, TableQuery};
use crate::guard::{self, CurrentUser};
use crate::models::{ApiResponse, Commission, CreatePromoCodeRequest, PromoCode, UpdatePromoCodeRequest};
use crate::reports::{self, PromoterDashboard};
use crate::state::AppState;
use crate::validation;

/// Build the promoter router.
pub fn router() -> Router {
    Router::new()
        .route("/promoter/dashboard", get(dashboard))
        .route("/promoter/codes", get(list_codes).post(create_code))
        .route("/promoter/codes/{code}", patch(set_code_active))
        .route("/promoter/commissions", get(list_commissions))
        .route_layer(middleware::from_fn(guard::require_promoter))
}

async fn dashboard(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
) -> AppResult<Json<ApiResponse<PromoterDashboard>>> {
    let (commissions, codes) = tokio::try_join!(
        state.promoter.commissions(&current.token),
        state.promoter.codes(&current.token),
    )?;
    let dashboard = reports::promoter_dashboard(&commissions, &codes, Utc::now());
    Ok(Json(ApiResponse::new(dashboard, "Dashboard retrieved")))
}

async fn list_codes(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Query(query): Query<TableQuery>,
) -> AppResult<Json<ApiResponse<Page<PromoCode>>>> {
    let codes = state.promoter.codes(&current.token).await?;
    Ok(Json(ApiResponse::new(filters::apply(codes, &query)?, "Promo codes retrieved")))
}

async fn create_code(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Json(mut req): Json<CreatePromoCodeRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<PromoCode>>)> {
    req.code = req.code.trim().to_ascii_uppercase();
    validation::validate_promo_code(&req)?;

    let code = state.promoter.create_code(&current.token, &req).await?;
    info!("Promoter {} created code {}", current.user.id, code.code);
    Ok((StatusCode::CREATED, Json(ApiResponse::new(code, "Promo code created"))))
}

async fn set_code_active(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Path(code): Path<String>,
    Json(req): Json<UpdatePromoCodeRequest>,
) -> AppResult<Json<ApiResponse<PromoCode>>> {
    let code = code.trim().to_ascii_uppercase();
    let existing = state
        .promoter
        .codes(&current.token)
        .await?
        .into_iter()
        .find(|c| c.code == code)
        .ok_or_else(|| AppError::NotFound(format!("promo code {}", code)))?;
    if existing.active == req.active {
        let state_name = if req.active { "active" } else { "inactive" };
        return Err(AppError::BadRequest(format!("promo code {} is already {}", code, state_name)));
    }

    let updated = state.promoter.set_code_active(&current.token, &code, req.active).await?;
    info!("Promo code {} active={} (by {})", code, req.active, current.user.id);
    Ok(Json(ApiResponse::new(updated, "Promo code updated")))
}

async fn list_commissions(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Query(query): Query<TableQuery>,
) -> AppResult<Json<ApiResponse<Page<Commission>>>> {
    let commissions = state.promoter.commissions(&current.token).await?;
    Ok(Json(ApiResponse::new(filters::apply(commissions, &query)?, "Commissions retrieved")))
}
