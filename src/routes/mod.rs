//! HTTP route modules for the storefront gateway.
//!
//! Each module owns one area of the application and applies its own guard:
//! - `storefront`: plans, promo previews, health (public)
//! - `auth`: sign-in, registration, session cookie
//! - `navigation`: page table and menus
//! - `checkout`: the five-step purchase wizard (guests allowed)
//! - `account`: customer cards and orders
//! - `admin`: regional admin console and reports
//! - `regions`: super admin region and role management
//! - `promoter`: promoter codes, commissions and dashboard

pub mod account;
pub mod admin;
pub mod auth;
pub mod checkout;
pub mod navigation;
pub mod promoter;
pub mod regions;
pub mod storefront;
