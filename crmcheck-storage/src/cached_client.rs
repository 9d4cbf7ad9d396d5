//! Cached record client.
//!
//! [`CachedRecordClient`] is the single access point steps use for the
//! record store. Lookups keyed by a simple discriminator go through a
//! scenario-scoped read-through cache; every mutation invalidates the whole
//! scope before it is sent.
//!
//! Cache faults never escape this type: a failed read is a miss, a failed
//! write or invalidation is logged and ignored. Record-store and schema
//! errors are always returned to the caller.

use std::future::Future;
use std::sync::Arc;

use crmcheck_core::{
    CacheSettings, CreateResult, CrmResult, EntityKind, FieldProjection, MutationResult, Record,
    RecordFilter,
};
use tracing::{debug, info, warn};

use crate::cache::{CacheableValue, Discriminator, KeyValueStore, ScenarioCache, ScenarioScope};
use crate::schema_cache::SchemaCache;
use crate::shaper::QueryShaper;
use crate::store::RecordStore;

/// Record client with read-through caching for one scenario execution.
///
/// # Usage
///
/// ```ignore
/// let client = CachedRecordClient::new(store, kv, schemas, settings, ScenarioScope::new(scenario, requestor));
///
/// // Cached: the second call is served from the cache
/// let lead = client.lead_find_by_email("a@b.c", &["Status"]).await?;
/// let again = client.lead_find_by_email("a@b.c", &["Status"]).await?;
///
/// // Invalidates the scope, then creates
/// client.lead_create(fields).await?;
/// ```
pub struct CachedRecordClient<S: RecordStore, K: KeyValueStore> {
    store: Arc<S>,
    cache: ScenarioCache<K>,
    shaper: QueryShaper,
}

impl<S: RecordStore, K: KeyValueStore> CachedRecordClient<S, K> {
    /// Create a client for one scenario scope.
    ///
    /// `schemas` belongs to the record-store connection and should be shared
    /// by every client built on that connection.
    pub fn new(
        store: Arc<S>,
        kv: Arc<K>,
        schemas: Arc<SchemaCache>,
        settings: CacheSettings,
        scope: ScenarioScope,
    ) -> Self {
        let shaper = QueryShaper::new(schemas, settings.max_query_length);
        Self {
            store,
            cache: ScenarioCache::new(kv, scope, settings),
            shaper,
        }
    }

    /// Get a reference to the underlying record store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a reference to the scenario cache.
    pub fn cache(&self) -> &ScenarioCache<K> {
        &self.cache
    }

    pub fn shaper(&self) -> &QueryShaper {
        &self.shaper
    }

    pub fn scope(&self) -> &ScenarioScope {
        self.cache.scope()
    }

    // ========================================================================
    // CACHE CONTROL
    // ========================================================================

    /// Delete every entry this scope has cached. Best effort.
    pub async fn clear_cache(&self) {
        match self.cache.clear().await {
            Ok(deleted) => info!(scope = %self.cache.scope(), deleted, "Cleared scenario cache"),
            Err(e) => warn!(scope = %self.cache.scope(), error = %e, "Failed to clear scenario cache"),
        }
    }

    /// Whether lookups on `entity` bypass the cache with a restricted projection.
    pub async fn should_restrict_fields(&self, entity: &EntityKind) -> CrmResult<bool> {
        self.shaper
            .should_restrict_fields(self.store.as_ref(), entity.as_str())
            .await
    }

    // ========================================================================
    // CACHED LOOKUPS
    // ========================================================================

    /// Find one record of `entity` matching `filter`, through the cache.
    ///
    /// `discriminator` must identify the same record as `filter`; it is what
    /// the cache key is built from. `include` lists fields the caller needs
    /// even when the projection has to be restricted.
    ///
    /// The cached value is the full match list, the same shape
    /// [`Self::find_cached`] stores, so both lookups can share a key.
    pub async fn find_one_cached(
        &self,
        entity: &EntityKind,
        filter: RecordFilter,
        discriminator: Discriminator,
        include: &[String],
    ) -> CrmResult<Option<Record>> {
        let records = self
            .find_cached(entity, filter, discriminator, include)
            .await?;
        Ok(records.into_iter().next())
    }

    /// Find every record of `entity` matching `filter`, through the cache.
    pub async fn find_cached(
        &self,
        entity: &EntityKind,
        filter: RecordFilter,
        discriminator: Discriminator,
        include: &[String],
    ) -> CrmResult<Vec<Record>> {
        let store = self.store.as_ref();
        let object_type = entity.as_str();
        self.read_through(entity, discriminator, include, move |projection| async move {
            store.find(object_type, &filter, &projection).await
        })
        .await
    }

    /// Read-through core shared by every cached lookup.
    async fn read_through<T, F, Fut>(
        &self,
        entity: &EntityKind,
        discriminator: Discriminator,
        include: &[String],
        fetch: F,
    ) -> CrmResult<T>
    where
        T: CacheableValue,
        F: FnOnce(FieldProjection) -> Fut,
        Fut: Future<Output = CrmResult<T>>,
    {
        let projection = self
            .shaper
            .project_fields(self.store.as_ref(), entity.as_str(), include)
            .await?;

        // A restricted response is not a full record; never cache it.
        if projection.is_restricted() {
            debug!(entity = %entity, discriminator = %discriminator, "Bypassing cache for restricted projection");
            return fetch(projection).await;
        }

        let key = self.cache.key_for(entity, &discriminator);
        match self.cache.get::<T>(&key).await {
            Ok(Some(value)) => {
                debug!(key = %key, "Cache hit");
                return Ok(value);
            }
            Ok(None) => debug!(key = %key, "Cache miss"),
            Err(e) => warn!(key = %key, error = %e, "Cache read failed, treating as miss"),
        }

        let value = fetch(FieldProjection::All).await?;
        if value.is_present() {
            if let Err(e) = self.cache.set(&key, &value).await {
                warn!(key = %key, error = %e, "Cache write failed");
            }
        }
        Ok(value)
    }

    // ========================================================================
    // PASSTHROUGH
    // ========================================================================

    /// Uncached multi-field lookup.
    pub async fn find_by_fields(
        &self,
        entity: &EntityKind,
        filter: &RecordFilter,
        projection: &FieldProjection,
    ) -> CrmResult<Vec<Record>> {
        self.store.find(entity.as_str(), filter, projection).await
    }

    /// Uncached single-record multi-field lookup.
    pub async fn find_one_by_fields(
        &self,
        entity: &EntityKind,
        filter: &RecordFilter,
        projection: &FieldProjection,
    ) -> CrmResult<Option<Record>> {
        self.store.find_one(entity.as_str(), filter, projection).await
    }

    /// Describe `entity` through the connection's schema cache.
    pub async fn describe(&self, entity: &EntityKind) -> CrmResult<Arc<crmcheck_core::ObjectSchema>> {
        self.shaper
            .schemas()
            .get_schema(self.store.as_ref(), entity.as_str())
            .await
    }

    // ========================================================================
    // MUTATIONS (scope invalidated first)
    // ========================================================================

    /// Create a record.
    pub async fn create(&self, entity: &EntityKind, fields: Record) -> CrmResult<CreateResult> {
        self.clear_cache().await;
        self.store.create(entity.as_str(), fields).await
    }

    /// Create several records.
    pub async fn bulk_create(
        &self,
        entity: &EntityKind,
        records: Vec<Record>,
    ) -> CrmResult<Vec<CreateResult>> {
        self.clear_cache().await;
        self.store.bulk_create(entity.as_str(), records).await
    }

    /// Update a record; `fields` must carry its `Id`.
    pub async fn update(&self, entity: &EntityKind, fields: Record) -> CrmResult<MutationResult> {
        self.clear_cache().await;
        self.store.update(entity.as_str(), fields).await
    }

    /// Delete a record by id.
    pub async fn delete(&self, entity: &EntityKind, id: &str) -> CrmResult<MutationResult> {
        self.clear_cache().await;
        self.store.delete(entity.as_str(), id).await
    }
}
