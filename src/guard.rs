//! Role-based route guards.
//!
//! Each router area is wrapped in one of the `require_*` middlewares, which
//! resolve the caller's token to a [`User`] through the upstream API and
//! evaluate the area's [`Access`] level. The page table mirrors the browser
//! router so clients can ask which pages a user may open.

use axum::extract::{FromRequestParts, Request};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::models::{Role, User};
use crate::state::AppState;

pub const TOKEN_COOKIE: &str = "rc_token";
const COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 7;

// ============================================================================
// Access levels
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Public,
    Authenticated,
    Promoter,
    RegionalAdmin,
    SuperAdmin,
}

impl Access {
    pub fn permits(&self, role: Role) -> bool {
        match self {
            Access::Public | Access::Authenticated => true,
            Access::Promoter => matches!(role, Role::Promoter | Role::SuperAdmin),
            Access::RegionalAdmin => matches!(role, Role::RegionalAdmin | Role::SuperAdmin),
            Access::SuperAdmin => role == Role::SuperAdmin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardOutcome {
    Allow,
    RedirectToLogin,
    Forbidden,
}

pub fn evaluate(access: Access, user: Option<&User>) -> GuardOutcome {
    if access == Access::Public {
        return GuardOutcome::Allow;
    }
    match user {
        None => GuardOutcome::RedirectToLogin,
        Some(user) if !user.is_active() => GuardOutcome::Forbidden,
        Some(user) if access.permits(user.role) => GuardOutcome::Allow,
        Some(_) => GuardOutcome::Forbidden,
    }
}

// ============================================================================
// Page table
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuSection {
    Storefront,
    Account,
    Admin,
    Promoter,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRoute {
    pub path: &'static str,
    pub title: &'static str,
    pub access: Access,
    pub section: MenuSection,
    #[serde(skip)]
    pub in_menu: bool,
}

const fn page(path: &'static str, title: &'static str, access: Access, section: MenuSection, in_menu: bool) -> PageRoute {
    PageRoute {
        path,
        title,
        access,
        section,
        in_menu,
    }
}

#[rustfmt::skip]
pub static PAGES: &[PageRoute] = &[
    page("/",                   "Home",             Access::Public,        MenuSection::Storefront, true),
    page("/pricing",            "Pricing",          Access::Public,        MenuSection::Storefront, true),
    page("/checkout",           "Checkout",         Access::Public,        MenuSection::Storefront, false),
    page("/checkout/:draftId",  "Checkout",         Access::Public,        MenuSection::Storefront, false),
    page("/login",              "Sign in",          Access::Public,        MenuSection::Storefront, false),
    page("/register",           "Create account",   Access::Public,        MenuSection::Storefront, false),
    page("/dashboard",          "Dashboard",        Access::Authenticated, MenuSection::Account,    true),
    page("/cards",              "My cards",         Access::Authenticated, MenuSection::Account,    true),
    page("/cards/:cardId",      "Card",             Access::Authenticated, MenuSection::Account,    false),
    page("/orders",             "My orders",        Access::Authenticated, MenuSection::Account,    true),
    page("/orders/:orderId",    "Order",            Access::Authenticated, MenuSection::Account,    false),
    page("/admin/users",        "Users",            Access::RegionalAdmin, MenuSection::Admin,      true),
    page("/admin/cards",        "Cards",            Access::RegionalAdmin, MenuSection::Admin,      true),
    page("/admin/orders",       "Orders",           Access::RegionalAdmin, MenuSection::Admin,      true),
    page("/admin/promoters",    "Promoters",        Access::RegionalAdmin, MenuSection::Admin,      true),
    page("/admin/commissions",  "Commissions",      Access::RegionalAdmin, MenuSection::Admin,      true),
    page("/admin/reports",      "Reports",          Access::RegionalAdmin, MenuSection::Admin,      true),
    page("/admin/regions",      "Regions",          Access::SuperAdmin,    MenuSection::Admin,      true),
    page("/promoter",           "Promoter home",    Access::Promoter,      MenuSection::Promoter,   true),
    page("/promoter/codes",     "Discount codes",   Access::Promoter,      MenuSection::Promoter,   true),
    page("/promoter/commissions", "Commissions",    Access::Promoter,      MenuSection::Promoter,   true),
];

fn path_matches(pattern: &str, path: &str) -> bool {
    let path = match path.split(['?', '#']).next() {
        Some(p) if p.len() > 1 => p.trim_end_matches('/'),
        Some(p) if !p.is_empty() => p,
        _ => "/",
    };
    let mut pattern_segments = pattern.split('/');
    let mut path_segments = path.split('/');
    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(expected), Some(actual)) => {
                let is_param = expected.starts_with(':') && !actual.is_empty();
                if !is_param && expected != actual {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// Find the page behind `path` and decide whether `user` may open it.
pub fn resolve(path: &str, user: Option<&User>) -> Option<(&'static PageRoute, GuardOutcome)> {
    PAGES
        .iter()
        .find(|p| path_matches(p.path, path))
        .map(|p| (p, evaluate(p.access, user)))
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuGroup {
    pub section: MenuSection,
    pub pages: Vec<&'static PageRoute>,
}

/// Menu entries `user` may open, grouped by section in page-table order.
pub fn menu(user: Option<&User>) -> Vec<MenuGroup> {
    let mut groups: Vec<MenuGroup> = Vec::new();
    for page in PAGES
        .iter()
        .filter(|p| p.in_menu && evaluate(p.access, user) == GuardOutcome::Allow)
    {
        match groups.iter_mut().find(|g| g.section == page.section) {
            Some(group) => group.pages.push(page),
            None => groups.push(MenuGroup {
                section: page.section,
                pages: vec![page],
            }),
        }
    }
    groups
}

// ============================================================================
// Token handling
// ============================================================================

/// Bearer token from the `Authorization` header, falling back to the session cookie.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn session_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        TOKEN_COOKIE, token, COOKIE_MAX_AGE_SECS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn cleared_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", TOKEN_COOKIE)
}

// ============================================================================
// Extractors and middleware
// ============================================================================

/// The signed-in caller, placed in request extensions by the guard middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentUser>().cloned().ok_or(AppError::Unauthorized)
    }
}

/// The caller if a valid token was sent; never rejects anonymous requests.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(current) = parts.extensions.get::<CurrentUser>() {
            return Ok(MaybeUser(Some(current.clone())));
        }
        let state = app_state(&parts.extensions)?;
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(MaybeUser(None));
        };
        let user = state.auth.me(&token).await?;
        Ok(MaybeUser(user.map(|user| CurrentUser { user, token })))
    }
}

impl MaybeUser {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref().map(|c| &c.user)
    }
}

fn app_state(extensions: &axum::http::Extensions) -> AppResult<AppState> {
    extensions
        .get::<AppState>()
        .cloned()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("application state not installed")))
}

async fn enforce(access: Access, mut req: Request, next: Next) -> AppResult<Response> {
    let state = app_state(req.extensions())?;
    let token = bearer_token(req.headers());
    let user = match &token {
        Some(token) => state.auth.me(token).await?,
        None => None,
    };

    match evaluate(access, user.as_ref()) {
        GuardOutcome::Allow => {}
        GuardOutcome::RedirectToLogin => {
            warn!("Anonymous request to {} rejected", req.uri().path());
            return Err(AppError::Unauthorized);
        }
        GuardOutcome::Forbidden => {
            warn!("Request to {} denied for {:?}", req.uri().path(), user.as_ref().map(|u| u.id));
            return Err(AppError::Forbidden(format!("{:?} access required", access)));
        }
    }

    if let (Some(user), Some(token)) = (user, token) {
        req.extensions_mut().insert(CurrentUser { user, token });
    }
    Ok(next.run(req).await)
}

pub async fn require_authenticated(req: Request, next: Next) -> AppResult<Response> {
    enforce(Access::Authenticated, req, next).await
}

pub async fn require_promoter(req: Request, next: Next) -> AppResult<Response> {
    enforce(Access::Promoter, req, next).await
}

pub async fn require_regional_admin(req: Request, next: Next) -> AppResult<Response> {
    enforce(Access::RegionalAdmin, req, next).await
}

pub async fn require_super_admin(req: Request, next: Next) -> AppResult<Response> {
    enforce(Access::SuperAdmin, req, next).await
}
