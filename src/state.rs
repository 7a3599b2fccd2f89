//! Shared application state, installed on every request as an `Extension`.

use std::sync::Arc;

use crate::checkout::{CheckoutService, CheckoutStore};
use crate::config::Settings;
use crate::error::AppResult;
use crate::services::{AdminService, ApiClient, AuthService, CardService, OrderService, PromoterService};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub auth: AuthService,
    pub cards: CardService,
    pub orders: OrderService,
    pub admin: AdminService,
    pub promoter: PromoterService,
    pub checkout: CheckoutService,
}

impl AppState {
    /// Wire every service to one upstream client and the given draft store.
    pub fn new(settings: Settings, drafts: Arc<dyn CheckoutStore>) -> AppResult<Self> {
        let api = ApiClient::new(&settings.api_base_url, settings.upstream_timeout)?;
        let orders = OrderService::new(api.clone());
        let checkout = CheckoutService::new(drafts, orders.clone(), settings.checkout_ttl)?;

        Ok(Self {
            auth: AuthService::new(api.clone()),
            cards: CardService::new(api.clone()),
            admin: AdminService::new(api.clone()),
            promoter: PromoterService::new(api),
            orders,
            checkout,
            settings: Arc::new(settings),
        })
    }
}
