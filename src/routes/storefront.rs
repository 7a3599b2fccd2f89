//! Public storefront routes.
//!
//! GET /health             - Liveness probe
//! GET /plans              - Card packages on sale
//! GET /promo-codes/{code} - Public preview of a promo code

use axum::extract::Path;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::{ApiResponse, Discount, Plan};
use crate::state::AppState;
use crate::validation;

/// Build the storefront router.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/plans", get(list_plans))
        .route("/promo-codes/{code}", get(preview_promo_code))
}

/// What a shopper may learn about a code before checkout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoPreview {
    pub code: String,
    pub discount: Discount,
    pub redeemable: bool,
    pub cheapest_plan: Option<PlanSaving>,
}

/// The discount the code takes off one unit of a plan.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSaving {
    pub plan_id: String,
    pub price: f64,
    pub saving: f64,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_plans(Extension(state): Extension<AppState>) -> AppResult<Json<ApiResponse<Vec<Plan>>>> {
    let plans = state.orders.plans().await?;
    Ok(Json(ApiResponse::new(plans, "Plans retrieved")))
}

async fn preview_promo_code(
    Extension(state): Extension<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<ApiResponse<PromoPreview>>> {
    let code = code.trim().to_ascii_uppercase();
    if !validation::is_promo_code(&code) {
        return Err(AppError::field("code", "Promo code is malformed"));
    }

    let (promo, plans) = tokio::try_join!(state.orders.promo_code(&code), state.orders.plans())?;
    let cheapest_plan = plans
        .iter()
        .min_by(|a, b| a.price.total_cmp(&b.price))
        .map(|plan| PlanSaving {
            plan_id: plan.id.clone(),
            price: plan.price,
            saving: promo.discount_on(plan.price),
        });
    let preview = PromoPreview {
        redeemable: promo.is_redeemable(Utc::now()),
        cheapest_plan,
        code: promo.code,
        discount: promo.discount,
    };
    Ok(Json(ApiResponse::new(preview, "Promo code retrieved")))
}
