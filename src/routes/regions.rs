//! Super admin routes.
//!
//! GET   /regions                - All regions
//! POST  /regions                - Create a region
//! PATCH /regions/{id}           - Rename or (de)activate a region
//! PUT   /regions/{id}/admin     - Assign the regional admin
//! PATCH /admin/users/{id}/role  - Change an account's role

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, patch, put};
use axum::{Extension, Json, Router};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::filters::{self, Page, TableQuery};
use crate::guard::{self, CurrentUser};
use crate::models::{
    ApiResponse, AssignAdminRequest, CreateRegionRequest, Region, Role, UpdateRegionRequest, UpdateUserRoleRequest,
    User,
};
use crate::state::AppState;
use crate::validation;

/// Build the super admin router.
pub fn router() -> Router {
    Router::new()
        .route("/regions", get(list_regions).post(create_region))
        .route("/regions/{id}", patch(update_region))
        .route("/regions/{id}/admin", put(assign_admin))
        .route("/admin/users/{id}/role", patch(set_user_role))
        .route_layer(middleware::from_fn(guard::require_super_admin))
}

async fn list_regions(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Query(query): Query<TableQuery>,
) -> AppResult<Json<ApiResponse<Page<Region>>>> {
    let regions = state.admin.regions(&current.token).await?;
    Ok(Json(ApiResponse::new(filters::apply(regions, &query)?, "Regions retrieved")))
}

async fn create_region(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Json(mut req): Json<CreateRegionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Region>>)> {
    req.name = req.name.trim().to_string();
    req.code = req.code.trim().to_ascii_uppercase();
    validation::validate_region(&req)?;

    let region = state.admin.create_region(&current.token, &req).await?;
    info!("Region {} created by {}", region.code, current.user.id);
    Ok((StatusCode::CREATED, Json(ApiResponse::new(region, "Region created"))))
}

async fn update_region(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(mut req): Json<UpdateRegionRequest>,
) -> AppResult<Json<ApiResponse<Region>>> {
    if let Some(name) = req.name.as_mut() {
        *name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::field("name", "Name is required"));
        }
    }

    let region = state.admin.update_region(&current.token, id, &req).await?;
    info!("Region {} updated by {}", region.code, current.user.id);
    Ok(Json(ApiResponse::new(region, "Region updated")))
}

async fn assign_admin(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignAdminRequest>,
) -> AppResult<Json<ApiResponse<Region>>> {
    let candidate = state
        .admin
        .users(&current.token, None)
        .await?
        .into_iter()
        .find(|u| u.id == req.admin_id)
        .ok_or_else(|| AppError::NotFound(format!("user {}", req.admin_id)))?;
    if candidate.role != Role::RegionalAdmin {
        return Err(AppError::field("adminId", "User must have the REGIONAL_ADMIN role"));
    }

    let region = state.admin.assign_admin(&current.token, id, req.admin_id).await?;
    info!("Region {} assigned to admin {}", region.code, req.admin_id);
    Ok(Json(ApiResponse::new(region, "Regional admin assigned")))
}

async fn set_user_role(
    Extension(state): Extension<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRoleRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    if id == current.user.id {
        return Err(AppError::Forbidden("you cannot change your own role".to_string()));
    }

    let user = state.admin.set_user_role(&current.token, id, req.role).await?;
    info!("User {} is now {} (by {})", id, req.role.as_str(), current.user.id);
    Ok(Json(ApiResponse::new(user, "User role updated")))
}
