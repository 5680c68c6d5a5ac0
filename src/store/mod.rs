//! Revocation store abstraction.
//!
//! A revocation store records tokens that must be rejected before their
//! natural expiry. Backends are pluggable behind [`RevocationStore`]:
//!
//! - [`memory::MemoryStore`] keeps entries in a concurrent map.
//! - [`redb::RedbStore`] persists entries in an embedded redb file.
//! - [`sqlite::SqliteStore`] keeps entries in an indexed SQLite table.
//!
//! Entries are keyed by [`token_key`], never by the raw bearer string.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

pub mod memory;
pub mod redb;
pub mod sqlite;

pub use memory::MemoryStore;
pub use redb::RedbStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(String),
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("store is closed")]
    Closed,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `token` as revoked for `ttl`.
    ///
    /// The entry must not outlive `ttl`. Re-recording an already revoked
    /// token never shortens its entry.
    async fn set(&self, token: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Whether `token` is currently revoked.
    async fn check(&self, token: &str) -> Result<bool, StoreError>;

    /// Release backend resources.
    async fn close(&self) -> Result<(), StoreError>;

    /// Drop entries whose TTL has elapsed. Returns the number removed.
    async fn purge_expired(&self) -> Result<usize, StoreError>;
}

/// Storage key for a token: lowercase hex SHA-256 of the bearer string.
pub fn token_key(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Expiry instant for an entry recorded at `now` with `ttl`.
pub(crate) fn expires_at(now: i64, ttl: Duration) -> i64 {
    now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX))
}
