//! SQLite-backed revocation store.
//!
//! Revocations share the service database (`revoked_tokens` table, indexed on
//! `expires_at`). Inserts are single statements, so a revocation is either
//! committed or absent.

use super::{RevocationStore, StoreError, expires_at, token_key};
use crate::clock::Clock;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct SqliteStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    /// Create a store over a migrated pool.
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl RevocationStore for SqliteStore {
    async fn set(&self, token: &str, ttl: Duration) -> Result<(), StoreError> {
        let until = expires_at(self.clock.now(), ttl);
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (token_key, expires_at)
            VALUES (?, ?)
            ON CONFLICT(token_key) DO UPDATE
            SET expires_at = MAX(expires_at, excluded.expires_at)
            "#,
        )
        .bind(token_key(token))
        .bind(until)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn check(&self, token: &str) -> Result<bool, StoreError> {
        let hit = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM revoked_tokens WHERE token_key = ? AND expires_at > ?",
        )
        .bind(token_key(token))
        .bind(self.clock.now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(hit.is_some())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.pool.close().await;
        info!("SQLite revocation store closed");
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= ?")
            .bind(self.clock.now())
            .execute(&self.pool)
            .await?;
        let removed = result.rows_affected() as usize;
        if removed > 0 {
            debug!(removed, "Purged expired revocations");
        }
        Ok(removed)
    }
}
