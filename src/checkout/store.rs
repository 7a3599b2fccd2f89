//! Draft persistence behind the [`CheckoutStore`] seam.
//!
//! `MemoryCheckoutStore` keeps drafts in process; `PgCheckoutStore` keeps
//! them in the `checkout_drafts` table so a wizard survives restarts and
//! works behind several gateway instances.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};
use uuid::Uuid;

use super::CheckoutDraft;
use crate::error::AppResult;

#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn insert(&self, draft: &CheckoutDraft) -> AppResult<()>;

    async fn get(&self, id: Uuid) -> AppResult<Option<CheckoutDraft>>;

    async fn save(&self, draft: &CheckoutDraft) -> AppResult<()>;

    /// Delete drafts last touched before `cutoff`; returns how many went.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;

    /// Take the exclusive right to place the draft's order. Returns false
    /// while another request holds a claim younger than `stale_before`.
    async fn claim(&self, id: Uuid, now: DateTime<Utc>, stale_before: DateTime<Utc>) -> AppResult<bool>;

    async fn release(&self, id: Uuid) -> AppResult<()>;
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Default)]
pub struct MemoryCheckoutStore {
    drafts: RwLock<HashMap<Uuid, CheckoutDraft>>,
    claims: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl MemoryCheckoutStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckoutStore for MemoryCheckoutStore {
    async fn insert(&self, draft: &CheckoutDraft) -> AppResult<()> {
        self.drafts.write().await.insert(draft.id, draft.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<CheckoutDraft>> {
        Ok(self.drafts.read().await.get(&id).cloned())
    }

    async fn save(&self, draft: &CheckoutDraft) -> AppResult<()> {
        self.drafts.write().await.insert(draft.id, draft.clone());
        Ok(())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut drafts = self.drafts.write().await;
        let before = drafts.len();
        drafts.retain(|_, draft| draft.updated_at >= cutoff);
        Ok((before - drafts.len()) as u64)
    }

    async fn claim(&self, id: Uuid, now: DateTime<Utc>, stale_before: DateTime<Utc>) -> AppResult<bool> {
        let mut claims = self.claims.lock().await;
        match claims.get(&id) {
            Some(since) if *since >= stale_before => Ok(false),
            _ => {
                claims.insert(id, now);
                Ok(true)
            }
        }
    }

    async fn release(&self, id: Uuid) -> AppResult<()> {
        self.claims.lock().await.remove(&id);
        Ok(())
    }
}

// ============================================================================
// Postgres store
// ============================================================================

pub struct PgCheckoutStore {
    pool: PgPool,
}

impl PgCheckoutStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckoutStore for PgCheckoutStore {
    async fn insert(&self, draft: &CheckoutDraft) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO checkout_drafts (id, owner_id, step, state, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(draft.id)
        .bind(draft.owner_id)
        .bind(draft.step.as_str())
        .bind(Json(draft))
        .bind(draft.created_at)
        .bind(draft.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<CheckoutDraft>> {
        let row: Option<(Json<CheckoutDraft>,)> = sqlx::query_as("SELECT state FROM checkout_drafts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(draft),)| draft))
    }

    async fn save(&self, draft: &CheckoutDraft) -> AppResult<()> {
        sqlx::query("UPDATE checkout_drafts SET step = $2, state = $3, updated_at = $4 WHERE id = $1")
            .bind(draft.id)
            .bind(draft.step.as_str())
            .bind(Json(draft))
            .bind(draft.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM checkout_drafts WHERE updated_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn claim(&self, id: Uuid, now: DateTime<Utc>, stale_before: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE checkout_drafts SET placing_since = $2
            WHERE id = $1 AND (placing_since IS NULL OR placing_since < $3)
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(stale_before)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE checkout_drafts SET placing_since = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Periodically delete drafts idle for longer than `ttl`.
pub fn spawn_sweeper(store: Arc<dyn CheckoutStore>, ttl: chrono::Duration, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match store.purge_older_than(Utc::now() - ttl).await {
                Ok(0) => {}
                Ok(purged) => info!("Purged {} expired checkout drafts", purged),
                Err(e) => error!("Failed to purge checkout drafts: {}", e),
            }
        }
    })
}
