//! Page-table routes used by the browser router.
//!
//! GET /navigation/menu          - Pages the caller may open, grouped by section
//! GET /navigation/resolve?path= - Guard decision for one path

use axum::extract::Query;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::guard::{self, GuardOutcome, MaybeUser, MenuGroup, PageRoute};
use crate::models::ApiResponse;

/// Build the navigation router.
pub fn router() -> Router {
    Router::new()
        .route("/navigation/menu", get(menu))
        .route("/navigation/resolve", get(resolve))
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct Resolution {
    pub page: &'static PageRoute,
    pub outcome: GuardOutcome,
    /// Where the client should go instead, when not allowed.
    pub redirect: Option<String>,
}

async fn menu(caller: MaybeUser) -> Json<ApiResponse<Vec<MenuGroup>>> {
    Json(ApiResponse::new(guard::menu(caller.user()), "Menu resolved"))
}

async fn resolve(caller: MaybeUser, Query(query): Query<ResolveQuery>) -> AppResult<Json<ApiResponse<Resolution>>> {
    let (page, outcome) = guard::resolve(&query.path, caller.user())
        .ok_or_else(|| AppError::NotFound(format!("page '{}'", query.path)))?;

    let redirect = match outcome {
        GuardOutcome::Allow => None,
        GuardOutcome::RedirectToLogin => Some(format!("/login?next={}", query.path)),
        GuardOutcome::Forbidden => Some("/".to_string()),
    };

    Ok(Json(ApiResponse::new(
        Resolution {
            page,
            outcome,
            redirect,
        },
        "Route resolved",
    )))
}
