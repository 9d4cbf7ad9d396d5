//! In-process key-value store with per-entry expiry.
//!
//! Suitable for single-process runs and tests. Expired entries are evicted
//! lazily on read and in bulk by [`InMemoryKeyValueStore::purge_expired`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use crmcheck_core::CacheResult;

use super::traits::KeyValueStore;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-memory key-value store.
///
/// Uses tokio::sync::RwLock for safe async access.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: tokio::sync::RwLock<HashMap<String, MemoryEntry>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// True if `key` holds a live entry.
    pub async fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .get(key)
            .is_some_and(|e| e.is_live(now))
    }

    /// Drop every expired entry, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: evict unless a concurrent writer refreshed it.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, ttl: Duration, value: &str) -> CacheResult<()> {
        let entry = MemoryEntry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
