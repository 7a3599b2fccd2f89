//! # Review Card Storefront
//!
//! Gateway between the browser and the review-card REST API: storefront and
//! checkout wizard, customer account, regional/super admin console and the
//! promoter module.
//!
//! ## Architecture
//!
//! - Axum handles HTTP routing, role guards and the session cookie
//! - reqwest forwards domain calls to the upstream API with the caller's token
//! - Checkout drafts live in memory, or in PostgreSQL when `APP_DATABASE_URL` is set

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use reviewcard_storefront::checkout::{spawn_sweeper, CheckoutStore, MemoryCheckoutStore, PgCheckoutStore};
use reviewcard_storefront::config::Settings;
use reviewcard_storefront::state::AppState;
use reviewcard_storefront::{create_app, db};

const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reviewcard_storefront=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting review card storefront");

    let settings = Settings::from_env()?;
    info!("Upstream API at {}", settings.api_base_url);

    let drafts: Arc<dyn CheckoutStore> = match &settings.database_url {
        Some(url) => Arc::new(PgCheckoutStore::new(db::connect(url).await?)),
        None => {
            info!("APP_DATABASE_URL not set, keeping checkout drafts in memory");
            Arc::new(MemoryCheckoutStore::new())
        }
    };

    let bind_addr = settings.bind_addr.clone();
    let state = AppState::new(settings, drafts)?;
    spawn_sweeper(state.checkout.store(), state.checkout.ttl(), SWEEP_INTERVAL);

    let app = create_app(state);

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
