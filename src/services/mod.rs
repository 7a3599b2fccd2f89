//! Service layer wrapping the upstream REST API.
//!
//! - `api`: shared HTTP client, token attachment and error mapping
//! - `auth_service`: login, registration, profile, logout
//! - `card_service`: card owner operations
//! - `order_service`: plans, promo lookup, quotes, orders, PayPal capture
//! - `admin_service`: regional and super-admin console
//! - `promoter_service`: promo codes and commissions of the signed-in promoter

pub mod admin_service;
pub mod api;
pub mod auth_service;
pub mod card_service;
pub mod order_service;
pub mod promoter_service;

pub use admin_service::AdminService;
pub use api::ApiClient;
pub use auth_service::AuthService;
pub use card_service::CardService;
pub use order_service::OrderService;
pub use promoter_service::PromoterService;
