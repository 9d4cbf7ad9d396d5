//! Per-scope registry of written cache keys.
//!
//! One entry per scope, stored under `cachekeys|<scope>`, holding a JSON
//! array of every key written in that scope. Bulk invalidation reads it to
//! know what to delete.
//!
//! # Concurrency
//!
//! Appends are read-modify-write against the backing store with no locking.
//! Two concurrent appends in the same scope can lose one key; the orphaned
//! entry is then only reclaimed by TTL expiry. Steps within one scenario are
//! expected to run one at a time.

use std::time::Duration;

use crmcheck_core::{CacheError, CacheResult};

use super::scope_key::{CacheKey, ScenarioScope};
use super::traits::KeyValueStore;

/// View of one scope's key registry.
pub struct KeyRegistry<'a, K: KeyValueStore + ?Sized> {
    store: &'a K,
    key: CacheKey,
    ttl: Duration,
}

impl<'a, K: KeyValueStore + ?Sized> KeyRegistry<'a, K> {
    pub fn new(store: &'a K, scope: &ScenarioScope, ttl: Duration) -> Self {
        Self {
            store,
            key: CacheKey::registry(scope),
            ttl,
        }
    }

    /// The registry's own cache key.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Keys recorded so far, in write order. A missing or empty registry is
    /// an empty list.
    pub async fn keys(&self) -> CacheResult<Vec<String>> {
        match self.store.get(self.key.as_str()).await? {
            None => Ok(Vec::new()),
            Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| CacheError::Deserialization {
                key: self.key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Record `key`, re-storing the registry with a fresh TTL.
    ///
    /// A key already present is not listed twice.
    pub async fn append(&self, key: &CacheKey) -> CacheResult<()> {
        let mut keys = self.keys().await?;
        if !keys.iter().any(|k| k == key.as_str()) {
            keys.push(key.to_string());
        }
        self.store_keys(&keys).await
    }

    /// Rewrite the registry as an empty list.
    pub async fn reset(&self) -> CacheResult<()> {
        self.store_keys(&[]).await
    }

    async fn store_keys(&self, keys: &[String]) -> CacheResult<()> {
        let raw = serde_json::to_string(keys).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        self.store.set_ex(self.key.as_str(), self.ttl, &raw).await
    }
}
