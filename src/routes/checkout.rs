//! Checkout wizard routes. Guests may check out; a signed-in owner's draft is
//! only visible to that owner.
//!
//! POST   /checkout              - Start a draft at the plan step
//! GET    /checkout/{id}         - Current draft
//! PUT    /checkout/{id}/plan    - Choose plan and quantity
//! PUT    /checkout/{id}/shipping - Shipping address and method
//! PUT    /checkout/{id}/payment - Payment method, moves to review with a quote
//! PUT    /checkout/{id}/promo   - Apply a promo code
//! DELETE /checkout/{id}/promo   - Remove the promo code
//! POST   /checkout/{id}/back    - One step back
//! POST   /checkout/{id}/place   - Create the order and capture payment

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::checkout::{CheckoutDraft, ShippingDetails};
use crate::error::AppResult;
use crate::guard::MaybeUser;
use crate::models::{ApiResponse, PaymentMethod};
use crate::state::AppState;

type DraftResponse = Json<ApiResponse<CheckoutDraft>>;

/// Build the checkout router.
pub fn router() -> Router {
    Router::new()
        .route("/checkout", post(start))
        .route("/checkout/{id}", get(show))
        .route("/checkout/{id}/plan", put(select_plan))
        .route("/checkout/{id}/shipping", put(set_shipping))
        .route("/checkout/{id}/payment", put(set_payment))
        .route("/checkout/{id}/promo", put(apply_promo).delete(remove_promo))
        .route("/checkout/{id}/back", post(back))
        .route("/checkout/{id}/place", post(place_order))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectPlanRequest {
    pub plan_id: String,
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SetPaymentRequest {
    pub method: PaymentMethod,
}

#[derive(Debug, Deserialize)]
pub struct ApplyPromoRequest {
    pub code: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub paypal_order_id: Option<String>,
}

fn draft_response(draft: CheckoutDraft) -> DraftResponse {
    let message = format!("Checkout at step '{}'", draft.step.as_str());
    Json(ApiResponse::new(draft, message))
}

async fn start(
    Extension(state): Extension<AppState>,
    caller: MaybeUser,
) -> AppResult<(StatusCode, DraftResponse)> {
    let draft = state.checkout.start(caller.0.as_ref()).await?;
    Ok((StatusCode::CREATED, draft_response(draft)))
}

async fn show(
    Extension(state): Extension<AppState>,
    caller: MaybeUser,
    Path(id): Path<Uuid>,
) -> AppResult<DraftResponse> {
    let draft = state.checkout.load(id, caller.0.as_ref()).await?;
    Ok(draft_response(draft))
}

async fn select_plan(
    Extension(state): Extension<AppState>,
    caller: MaybeUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectPlanRequest>,
) -> AppResult<DraftResponse> {
    let draft = state
        .checkout
        .select_plan(id, caller.0.as_ref(), &req.plan_id, req.quantity)
        .await?;
    Ok(draft_response(draft))
}

async fn set_shipping(
    Extension(state): Extension<AppState>,
    caller: MaybeUser,
    Path(id): Path<Uuid>,
    Json(details): Json<ShippingDetails>,
) -> AppResult<DraftResponse> {
    let draft = state.checkout.set_shipping(id, caller.0.as_ref(), details).await?;
    Ok(draft_response(draft))
}

async fn set_payment(
    Extension(state): Extension<AppState>,
    caller: MaybeUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SetPaymentRequest>,
) -> AppResult<DraftResponse> {
    let draft = state.checkout.set_payment(id, caller.0.as_ref(), req.method).await?;
    Ok(draft_response(draft))
}

async fn apply_promo(
    Extension(state): Extension<AppState>,
    caller: MaybeUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ApplyPromoRequest>,
) -> AppResult<DraftResponse> {
    let draft = state.checkout.apply_promo(id, caller.0.as_ref(), &req.code).await?;
    Ok(draft_response(draft))
}

async fn remove_promo(
    Extension(state): Extension<AppState>,
    caller: MaybeUser,
    Path(id): Path<Uuid>,
) -> AppResult<DraftResponse> {
    let draft = state.checkout.remove_promo(id, caller.0.as_ref()).await?;
    Ok(draft_response(draft))
}

async fn back(
    Extension(state): Extension<AppState>,
    caller: MaybeUser,
    Path(id): Path<Uuid>,
) -> AppResult<DraftResponse> {
    let draft = state.checkout.back(id, caller.0.as_ref()).await?;
    Ok(draft_response(draft))
}

async fn place_order(
    Extension(state): Extension<AppState>,
    caller: MaybeUser,
    Path(id): Path<Uuid>,
    Json(req): Json<PlaceOrderRequest>,
) -> AppResult<DraftResponse> {
    let draft = state
        .checkout
        .place_order(id, caller.0.as_ref(), req.paypal_order_id.as_deref())
        .await?;
    Ok(draft_response(draft))
}
