//! Scenario-scoped cache over a key-value store.
//!
//! Every operation returns a [`CacheResult`]; this layer never decides what a
//! failure means. [`crate::CachedRecordClient`] converts failures into misses
//! and logged no-ops so that a cache malfunction cannot break a lookup or a
//! mutation.

use std::sync::Arc;

use crmcheck_core::{CacheError, CacheResult, CacheSettings, EntityKind};
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use super::registry::KeyRegistry;
use super::scope_key::{CacheKey, Discriminator, ScenarioScope};
use super::traits::KeyValueStore;

/// Cache namespace for one scenario execution.
///
/// # Example
///
/// ```ignore
/// let cache = ScenarioCache::new(store, ScenarioScope::new(scenario_id, requestor_id), settings);
/// let key = cache.key_for(&EntityKind::Contact, &Discriminator::email("a@b.c"));
/// cache.set(&key, &record).await?;
/// let hit: Option<Vec<Record>> = cache.get(&key).await?;
/// ```
pub struct ScenarioCache<K: KeyValueStore> {
    store: Arc<K>,
    scope: ScenarioScope,
    settings: CacheSettings,
}

impl<K: KeyValueStore> ScenarioCache<K> {
    pub fn new(store: Arc<K>, scope: ScenarioScope, settings: CacheSettings) -> Self {
        Self {
            store,
            scope,
            settings,
        }
    }

    pub fn scope(&self) -> &ScenarioScope {
        &self.scope
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Get a reference to the backing store.
    pub fn backend(&self) -> &K {
        &self.store
    }

    /// This scope's key registry.
    pub fn registry(&self) -> KeyRegistry<'_, K> {
        KeyRegistry::new(self.store.as_ref(), &self.scope, self.settings.entry_ttl)
    }

    /// Cache key for a lookup of `entity` identified by `discriminator`.
    pub fn key_for(&self, entity: &EntityKind, discriminator: &Discriminator) -> CacheKey {
        CacheKey::record(&self.settings.provider_tag, entity, discriminator, &self.scope)
    }

    /// Read and deserialize a cached value.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> CacheResult<Option<T>> {
        let Some(raw) = self.store.get(key.as_str()).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CacheError::Deserialization {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    /// Serialize and store a value, then record its key in the registry.
    ///
    /// The entry is written before the registry; if the registry update
    /// fails the entry is unreachable by [`ScenarioCache::clear`] but still
    /// expires with its TTL.
    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T) -> CacheResult<()> {
        let raw = serde_json::to_string(value).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        self.store
            .set_ex(key.as_str(), self.settings.entry_ttl, &raw)
            .await?;
        self.registry().append(key).await
    }

    /// Delete every key recorded in this scope's registry, then reset it.
    ///
    /// Individual delete failures are logged and skipped. Returns the number
    /// of keys successfully deleted.
    pub async fn clear(&self) -> CacheResult<usize> {
        let registry = self.registry();
        let keys = registry.keys().await?;

        let mut deleted = 0;
        for key in &keys {
            match self.store.del(key).await {
                Ok(()) => deleted += 1,
                Err(e) => warn!(key = %key, error = %e, "Failed to delete cache entry"),
            }
        }

        registry.reset().await?;
        Ok(deleted)
    }
}

impl<K: KeyValueStore> Clone for ScenarioCache<K> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            scope: self.scope.clone(),
            settings: self.settings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::InMemoryKeyValueStore;
    use async_trait::async_trait;
    use crmcheck_core::Record;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    fn test_cache(scenario: &str) -> (ScenarioCache<InMemoryKeyValueStore>, Arc<InMemoryKeyValueStore>) {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let cache = ScenarioCache::new(
            Arc::clone(&store),
            ScenarioScope::new(scenario, "requestor"),
            CacheSettings::default(),
        );
        (cache, store)
    }

    fn contacts() -> Vec<Record> {
        match json!({"Id": "003xx", "Email": "a@b.c"}) {
            serde_json::Value::Object(map) => vec![map],
            _ => Vec::new(),
        }
    }

    // Store whose deletes fail for a configured set of keys.
    #[derive(Default)]
    struct PartiallyFailingStore {
        inner: InMemoryKeyValueStore,
        failing_deletes: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl KeyValueStore for PartiallyFailingStore {
        async fn get(&self, key: &str) -> CacheResult<Option<String>> {
            self.inner.get(key).await
        }

        async fn set_ex(&self, key: &str, ttl: Duration, value: &str) -> CacheResult<()> {
            self.inner.set_ex(key, ttl, value).await
        }

        async fn del(&self, key: &str) -> CacheResult<()> {
            if self.failing_deletes.lock().unwrap().contains(key) {
                return Err(CacheError::Backend {
                    operation: "del".to_string(),
                    reason: "connection reset".to_string(),
                });
            }
            self.inner.del(key).await
        }
    }

    #[tokio::test]
    async fn test_set_then_get_round_trips_and_registers_key() {
        let (cache, store) = test_cache("s1");
        let key = cache.key_for(&EntityKind::Contact, &Discriminator::email("a@b.c"));

        cache.set(&key, &contacts()).await.unwrap();

        let hit: Option<Vec<Record>> = cache.get(&key).await.unwrap();
        assert_eq!(hit, Some(contacts()));
        assert_eq!(cache.registry().keys().await.unwrap(), vec![key.to_string()]);
        assert!(store.contains_key("cachekeys|s1requestor").await);
    }

    #[tokio::test]
    async fn test_get_miss() {
        let (cache, _store) = test_cache("s1");
        let key = cache.key_for(&EntityKind::Lead, &Discriminator::email("x@y.z"));
        let miss: Option<Vec<Record>> = cache.get(&key).await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_an_error() {
        let (cache, store) = test_cache("s1");
        let key = cache.key_for(&EntityKind::Lead, &Discriminator::email("x@y.z"));
        store
            .set_ex(key.as_str(), Duration::from_secs(55), "{truncated")
            .await
            .unwrap();

        let result: CacheResult<Option<Vec<Record>>> = cache.get(&key).await;
        assert!(matches!(result, Err(CacheError::Deserialization { .. })));
    }

    #[tokio::test]
    async fn test_clear_deletes_registered_keys_only_in_scope() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let mine = ScenarioCache::new(
            Arc::clone(&store),
            ScenarioScope::new("mine", "r"),
            CacheSettings::default(),
        );
        let theirs = ScenarioCache::new(
            Arc::clone(&store),
            ScenarioScope::new("theirs", "r"),
            CacheSettings::default(),
        );

        let a = mine.key_for(&EntityKind::Contact, &Discriminator::email("a@b.c"));
        let b = mine.key_for(&EntityKind::Case, &Discriminator::id("500"));
        let c = theirs.key_for(&EntityKind::Contact, &Discriminator::email("a@b.c"));
        mine.set(&a, &contacts()).await.unwrap();
        mine.set(&b, &contacts()).await.unwrap();
        theirs.set(&c, &contacts()).await.unwrap();

        assert_eq!(mine.clear().await.unwrap(), 2);

        assert!(!store.contains_key(a.as_str()).await);
        assert!(!store.contains_key(b.as_str()).await);
        assert!(store.contains_key(c.as_str()).await);
        assert!(mine.registry().keys().await.unwrap().is_empty());
        assert_eq!(theirs.registry().keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_with_no_registry() {
        let (cache, _store) = test_cache("fresh");
        assert_eq!(cache.clear().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_swallows_individual_delete_failures() {
        let store = Arc::new(PartiallyFailingStore::default());
        let cache = ScenarioCache::new(
            Arc::clone(&store),
            ScenarioScope::new("s", "r"),
            CacheSettings::default(),
        );

        let a = cache.key_for(&EntityKind::Contact, &Discriminator::email("a@b.c"));
        let b = cache.key_for(&EntityKind::Contact, &Discriminator::email("b@b.c"));
        cache.set(&a, &contacts()).await.unwrap();
        cache.set(&b, &contacts()).await.unwrap();
        store.failing_deletes.lock().unwrap().insert(a.to_string());

        assert_eq!(cache.clear().await.unwrap(), 1);
        assert!(cache.registry().keys().await.unwrap().is_empty());
        // The stale entry survives until its TTL lapses.
        assert!(store.inner.contains_key(a.as_str()).await);
        assert!(!store.inner.contains_key(b.as_str()).await);
    }

    #[tokio::test]
    async fn test_entries_and_registry_expire_without_clear() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let cache = ScenarioCache::new(
            Arc::clone(&store),
            ScenarioScope::new("s", "r"),
            CacheSettings::default().with_ttl(Duration::from_millis(30)),
        );
        let key = cache.key_for(&EntityKind::Contact, &Discriminator::email("a@b.c"));
        cache.set(&key, &contacts()).await.unwrap();
        assert_eq!(store.len().await, 2);

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(store.is_empty().await);
    }
}
