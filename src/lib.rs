//! # Review Card Storefront Library
//!
//! Exposes the Axum router and modules so integration tests can create
//! an in-process server against a stub upstream API.

pub mod checkout;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod guard;
pub mod models;
pub mod reports;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;

use axum::{Extension, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the Axum router with all route modules and middleware.
///
/// The caller provides fully wired state; this function does NOT start a
/// server or the draft sweeper.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::storefront::router())
        .merge(routes::auth::router())
        .merge(routes::navigation::router())
        .merge(routes::checkout::router())
        .merge(routes::account::router())
        .merge(routes::admin::router())
        .merge(routes::regions::router())
        .merge(routes::promoter::router())
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
