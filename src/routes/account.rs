//! Customer account routes (authenticated).
//!
//! GET   /account/dashboard           - Card and order overview
//! GET   /account/cards               - Cards owned by the caller
//! PATCH /account/cards/{id}          - Edit business name / review link
//! POST  /account/cards/{id}/activate - Bind a tag UID and switch the card on
//! GET   /account/orders              - Caller's orders, newest first
//! GET   /account/orders/{id}         - One order

use axum::extract::Path;
use axum::middleware;
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::guard::{self, CurrentUser};
use crate::models::{ActivateCardRequest, ApiResponse, Card, CardStatus, Order, UpdateCardRequest};
use crate::reports::{self, AccountDashboard};
use crate::state::AppState;
use crate::validation;

/// Build the account router.
pub fn router() -> Router {
    Router::new()
        .route("/account/dashboard", get(dashboard))
        .route("/account/cards", get(list_cards))
        .route("/account/cards/{id}", patch(update_card))
        .route("/account/cards/{id}/activate", post(activate_card))
        .route("/account/orders", get(list_orders))
        .route("/account/orders/{id}", get(get_order))
        .route_layer(middleware::from_fn(guard::require_authenticated))
}

async fn dashboard(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
) -> AppResult<Json<ApiResponse<AccountDashboard>>> {
    let (cards, orders) = tokio::try_join!(
        state.cards.my_cards(&current.token),
        state.orders.my_orders(&current.token),
    )?;
    let dashboard = reports::account_dashboard(&cards, orders);
    Ok(Json(ApiResponse::new(dashboard, "Dashboard retrieved")))
}

async fn list_cards(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<Card>>>> {
    let cards = state.cards.my_cards(&current.token).await?;
    Ok(Json(ApiResponse::new(cards, "Cards retrieved")))
}

async fn update_card(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCardRequest>,
) -> AppResult<Json<ApiResponse<Card>>> {
    validation::validate_card_update(&req)?;
    let card = state.cards.update_card(&current.token, id, &req).await?;
    info!("Card {} updated by {}", id, current.user.id);
    Ok(Json(ApiResponse::new(card, "Card updated")))
}

async fn activate_card(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ActivateCardRequest>,
) -> AppResult<Json<ApiResponse<Card>>> {
    let uid = req.uid.trim().to_ascii_uppercase();
    validation::validate_card_uid(&uid)?;

    let cards = state.cards.my_cards(&current.token).await?;
    let card = cards
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| AppError::NotFound(format!("card {}", id)))?;
    if card.status == CardStatus::Active {
        return Err(AppError::InvalidTransition {
            entity: "card",
            from: card.status.as_str(),
            to: CardStatus::Active.as_str(),
        });
    }

    let card = state.cards.activate(&current.token, id, &uid).await?;
    info!("Card {} activated with tag {}", id, uid);
    Ok(Json(ApiResponse::new(card, "Card activated")))
}

async fn list_orders(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let mut orders = state.orders.my_orders(&current.token).await?;
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(ApiResponse::new(orders, "Orders retrieved")))
}

async fn get_order(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.order(&current.token, id).await?;
    Ok(Json(ApiResponse::new(order, "Order retrieved")))
}
