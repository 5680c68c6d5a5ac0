//! In-process revocation store.
//!
//! Entries live in a [`DashMap`] keyed by token digest with their expiry
//! instant. Expired entries are dropped lazily on lookup and eagerly by
//! [`RevocationStore::purge_expired`].

use super::{RevocationStore, StoreError, expires_at, token_key};
use crate::clock::Clock;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<String, i64>,
    clock: Arc<dyn Clock>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            closed: AtomicBool::new(false),
        }
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl RevocationStore for MemoryStore {
    async fn set(&self, token: &str, ttl: Duration) -> Result<(), StoreError> {
        self.ensure_open()?;
        let until = expires_at(self.clock.now(), ttl);
        self.entries
            .entry(token_key(token))
            .and_modify(|existing| *existing = (*existing).max(until))
            .or_insert(until);
        Ok(())
    }

    async fn check(&self, token: &str) -> Result<bool, StoreError> {
        self.ensure_open()?;
        let key = token_key(token);
        let now = self.clock.now();
        // Removal is conditional so a concurrent re-revocation is never lost.
        if self
            .entries
            .remove_if(&key, |_, until| *until <= now)
            .is_some()
        {
            return Ok(false);
        }
        Ok(self.entries.get(&key).is_some_and(|until| *until > now))
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        self.entries.clear();
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        self.ensure_open()?;
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, until| *until > now);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Purged expired revocations");
        }
        Ok(removed)
    }
}
