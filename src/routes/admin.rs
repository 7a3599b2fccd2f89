//! Regional admin console routes.
//!
//! GET   /admin/users|cards|orders|promoters|commissions - Filtered tables
//! PATCH /admin/users/{id}/status                         - Activate / suspend an account
//! PATCH /admin/cards/{id}/status                         - Switch a card on or off
//! PATCH /admin/orders/{id}/status                        - Advance an order
//! PATCH /admin/commissions/{id}/status                   - Pay out or cancel a commission
//! GET   /admin/reports                                   - Dashboard figures and charts
//!
//! Regional admins only ever see their own region: the region filter is
//! forced to it, and status changes look the target up inside that scope
//! first so foreign records read as missing.

use axum::extract::{Path, Query};
use axum::middleware;
use axum::routing::{get, patch};
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::filters::{self, Page, TableQuery};
use crate::guard::{self, CurrentUser};
use crate::models::{
    ApiResponse, Card, Commission, Order, Promoter, Role, UpdateCardStatusRequest, UpdateCommissionStatusRequest,
    UpdateOrderStatusRequest, UpdateUserStatusRequest, User,
};
use crate::reports::{self, AdminReport, DateRange};
use crate::state::AppState;

/// Build the regional admin router.
pub fn router() -> Router {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}/status", patch(set_user_status))
        .route("/admin/cards", get(list_cards))
        .route("/admin/cards/{id}/status", patch(set_card_status))
        .route("/admin/orders", get(list_orders))
        .route("/admin/orders/{id}/status", patch(set_order_status))
        .route("/admin/promoters", get(list_promoters))
        .route("/admin/commissions", get(list_commissions))
        .route("/admin/commissions/{id}/status", patch(set_commission_status))
        .route("/admin/reports", get(report))
        .route_layer(middleware::from_fn(guard::require_regional_admin))
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub region: Option<String>,
}

/// Region a caller may query. Super admins may pick any region (or none);
/// everyone else is pinned to the region on their profile.
pub fn scope_region(user: &User, requested: Option<&str>) -> AppResult<Option<String>> {
    let requested = requested.map(str::trim).filter(|r| !r.is_empty());
    if user.is_super_admin() {
        return Ok(requested.map(str::to_ascii_uppercase));
    }

    let own = user
        .region
        .as_deref()
        .ok_or_else(|| AppError::Forbidden("no region assigned to this account".to_string()))?;
    match requested {
        Some(region) if !region.eq_ignore_ascii_case(own) => {
            warn!("Admin {} asked for region {} outside {}", user.id, region, own);
            Err(AppError::Forbidden(format!("region {} is outside your scope", region)))
        }
        _ => Ok(Some(own.to_string())),
    }
}

fn scoped_query(current: &CurrentUser, mut query: TableQuery) -> AppResult<(Option<String>, TableQuery)> {
    let region = scope_region(&current.user, query.region.as_deref())?;
    query.region = region.clone();
    Ok((region, query))
}

// ============================================================================
// Tables
// ============================================================================

async fn list_users(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Query(query): Query<TableQuery>,
) -> AppResult<Json<ApiResponse<Page<User>>>> {
    let (region, query) = scoped_query(&current, query)?;
    let users = state.admin.users(&current.token, region.as_deref()).await?;
    Ok(Json(ApiResponse::new(filters::apply(users, &query)?, "Users retrieved")))
}

async fn list_cards(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Query(query): Query<TableQuery>,
) -> AppResult<Json<ApiResponse<Page<Card>>>> {
    let (region, query) = scoped_query(&current, query)?;
    let cards = state.admin.cards(&current.token, region.as_deref()).await?;
    Ok(Json(ApiResponse::new(filters::apply(cards, &query)?, "Cards retrieved")))
}

async fn list_orders(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Query(query): Query<TableQuery>,
) -> AppResult<Json<ApiResponse<Page<Order>>>> {
    let (region, query) = scoped_query(&current, query)?;
    let orders = state.admin.orders(&current.token, region.as_deref()).await?;
    Ok(Json(ApiResponse::new(filters::apply(orders, &query)?, "Orders retrieved")))
}

async fn list_promoters(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Query(query): Query<TableQuery>,
) -> AppResult<Json<ApiResponse<Page<Promoter>>>> {
    let (region, query) = scoped_query(&current, query)?;
    let promoters = state.admin.promoters(&current.token, region.as_deref()).await?;
    Ok(Json(ApiResponse::new(filters::apply(promoters, &query)?, "Promoters retrieved")))
}

async fn list_commissions(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Query(query): Query<TableQuery>,
) -> AppResult<Json<ApiResponse<Page<Commission>>>> {
    let (region, query) = scoped_query(&current, query)?;
    let commissions = state.admin.commissions(&current.token, region.as_deref()).await?;
    Ok(Json(ApiResponse::new(filters::apply(commissions, &query)?, "Commissions retrieved")))
}

// ============================================================================
// Status changes
// ============================================================================

async fn set_user_status(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(change): Json<UpdateUserStatusRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    if id == current.user.id {
        return Err(AppError::Forbidden("you cannot change your own status".to_string()));
    }

    let region = scope_region(&current.user, None)?;
    let target = state
        .admin
        .users(&current.token, region.as_deref())
        .await?
        .into_iter()
        .find(|u| u.id == id)
        .ok_or_else(|| AppError::NotFound(format!("user {}", id)))?;

    let manageable = current.user.is_super_admin() || matches!(target.role, Role::User | Role::Promoter);
    if !manageable {
        return Err(AppError::Forbidden("only a super admin can manage admin accounts".to_string()));
    }
    if target.status == change.status {
        return Err(AppError::InvalidTransition {
            entity: "user",
            from: target.status.as_str(),
            to: change.status.as_str(),
        });
    }

    let user = state.admin.set_user_status(&current.token, id, change.status).await?;
    info!("User {} set to {} by {}", id, change.status.as_str(), current.user.id);
    Ok(Json(ApiResponse::new(user, "User status updated")))
}

async fn set_card_status(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(change): Json<UpdateCardStatusRequest>,
) -> AppResult<Json<ApiResponse<Card>>> {
    let region = scope_region(&current.user, None)?;
    let target = state
        .admin
        .cards(&current.token, region.as_deref())
        .await?
        .into_iter()
        .find(|c| c.id == id)
        .ok_or_else(|| AppError::NotFound(format!("card {}", id)))?;

    if !target.status.can_transition_to(change.status) {
        return Err(AppError::InvalidTransition {
            entity: "card",
            from: target.status.as_str(),
            to: change.status.as_str(),
        });
    }

    let card = state.admin.set_card_status(&current.token, id, change.status).await?;
    info!("Card {} set to {} by {}", id, change.status.as_str(), current.user.id);
    Ok(Json(ApiResponse::new(card, "Card status updated")))
}

async fn set_order_status(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(change): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let region = scope_region(&current.user, None)?;
    let target = state
        .admin
        .orders(&current.token, region.as_deref())
        .await?
        .into_iter()
        .find(|o| o.id == id)
        .ok_or_else(|| AppError::NotFound(format!("order {}", id)))?;

    if !target.status.can_transition_to(change.status) {
        return Err(AppError::InvalidTransition {
            entity: "order",
            from: target.status.as_str(),
            to: change.status.as_str(),
        });
    }

    let order = state.admin.set_order_status(&current.token, id, change.status).await?;
    info!(
        "Order {} moved {} -> {} by {}",
        order.order_number,
        target.status.as_str(),
        change.status.as_str(),
        current.user.id
    );
    Ok(Json(ApiResponse::new(order, "Order status updated")))
}

async fn set_commission_status(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(change): Json<UpdateCommissionStatusRequest>,
) -> AppResult<Json<ApiResponse<Commission>>> {
    let region = scope_region(&current.user, None)?;
    let target = state
        .admin
        .commissions(&current.token, region.as_deref())
        .await?
        .into_iter()
        .find(|c| c.id == id)
        .ok_or_else(|| AppError::NotFound(format!("commission {}", id)))?;

    if !target.status.can_transition_to(change.status) {
        return Err(AppError::InvalidTransition {
            entity: "commission",
            from: target.status.as_str(),
            to: change.status.as_str(),
        });
    }

    let commission = state
        .admin
        .set_commission_status(&current.token, id, change.status)
        .await?;
    info!("Commission {} set to {} by {}", id, change.status.as_str(), current.user.id);
    Ok(Json(ApiResponse::new(commission, "Commission status updated")))
}

// ============================================================================
// Reports
// ============================================================================

async fn report(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ApiResponse<AdminReport>>> {
    let range = DateRange {
        from: query.from,
        to: query.to,
    };
    range.validate()?;
    let region = scope_region(&current.user, query.region.as_deref())?;
    let region = region.as_deref();
    let token = current.token.as_str();

    let (orders, cards, users, promoters) = tokio::try_join!(
        state.admin.orders(token, region),
        state.admin.cards(token, region),
        state.admin.users(token, region),
        state.admin.promoters(token, region),
    )?;

    let report = reports::admin_report(&orders, &cards, &users, &promoters, &range);
    Ok(Json(ApiResponse::new(report, "Report generated")))
}
