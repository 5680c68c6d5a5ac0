//! Redb-backed revocation store.
//!
//! Persists revocations in an embedded redb file so they survive restarts.
//!
//! # Schema
//!
//! ```text
//! REVOKED_TOKENS: token_key -> expires_at (unix seconds)
//! ```
//!
//! Every write commits in a single transaction: a revocation is either
//! fully visible to later checks or absent.

use super::{RevocationStore, StoreError, expires_at, token_key};
use crate::clock::Clock;
use async_trait::async_trait;
use parking_lot::RwLock;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const REVOKED_TOKENS: TableDefinition<&str, i64> = TableDefinition::new("revoked_tokens");

pub struct RedbStore {
    db: RwLock<Option<Database>>,
    clock: Arc<dyn Clock>,
}

impl RedbStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path).map_err(|e| StoreError::Database(e.to_string()))?;

        // Ensure the table exists so read transactions never race its creation.
        let write_txn = db
            .begin_write()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        {
            let _ = write_txn
                .open_table(REVOKED_TOKENS)
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        info!(path = %path.display(), "Redb revocation store opened");
        Ok(Self {
            db: RwLock::new(Some(db)),
            clock,
        })
    }
}

#[async_trait]
impl RevocationStore for RedbStore {
    async fn set(&self, token: &str, ttl: Duration) -> Result<(), StoreError> {
        let key = token_key(token);
        let until = expires_at(self.clock.now(), ttl);

        let guard = self.db.read();
        let db = guard.as_ref().ok_or(StoreError::Closed)?;
        let write_txn = db
            .begin_write()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(REVOKED_TOKENS)
                .map_err(|e| StoreError::Database(e.to_string()))?;
            let existing = table
                .get(key.as_str())
                .map_err(|e| StoreError::Database(e.to_string()))?
                .map(|v| v.value());
            let until = existing.map_or(until, |current| current.max(until));
            table
                .insert(key.as_str(), until)
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    async fn check(&self, token: &str) -> Result<bool, StoreError> {
        let key = token_key(token);
        let now = self.clock.now();

        let guard = self.db.read();
        let db = guard.as_ref().ok_or(StoreError::Closed)?;
        let read_txn = db
            .begin_read()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let table = read_txn
            .open_table(REVOKED_TOKENS)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let until = table
            .get(key.as_str())
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|v| v.value());
        Ok(until.is_some_and(|until| until > now))
    }

    async fn close(&self) -> Result<(), StoreError> {
        // Dropping the database flushes it and releases the file lock.
        if self.db.write().take().is_some() {
            info!("Redb revocation store closed");
        }
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();

        let guard = self.db.read();
        let db = guard.as_ref().ok_or(StoreError::Closed)?;
        let write_txn = db
            .begin_write()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let mut count = 0;
        {
            let mut table = write_txn
                .open_table(REVOKED_TOKENS)
                .map_err(|e| StoreError::Database(e.to_string()))?;

            let mut to_delete = Vec::new();
            for item in table
                .iter()
                .map_err(|e| StoreError::Database(e.to_string()))?
            {
                let (k, v) = item.map_err(|e| StoreError::Database(e.to_string()))?;
                if v.value() <= now {
                    to_delete.push(k.value().to_string());
                }
            }

            for k in to_delete {
                table
                    .remove(k.as_str())
                    .map_err(|e| StoreError::Database(e.to_string()))?;
                count += 1;
            }
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if count > 0 {
            debug!(removed = count, "Purged expired revocations");
        }
        Ok(count)
    }
}
