//! Database helpers for persisted checkout drafts.
//!
//! The gateway owns no domain tables; its only schema is `checkout_drafts`,
//! created by the embedded migrations.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Type alias for the application database pool.
pub type AppDb = PgPool;

/// Connect to `url` and bring the schema up to date.
pub async fn connect(url: &str) -> anyhow::Result<AppDb> {
    let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
    info!("Connected to application database");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Application migrations complete");
    Ok(pool)
}
