//! crmcheck Storage - Record Access Layer
//!
//! The record store capability trait, the per-connection schema cache, the
//! query shaper that keeps "select every field" queries under the store's
//! URL length limit, and the scenario-scoped read-through cache that every
//! step reads and writes records through.

pub mod cache;
pub mod cached_client;
pub mod entities;
pub mod schema_cache;
pub mod shaper;
pub mod store;

pub use cache::{
    CacheKey, CacheableValue, Discriminator, InMemoryKeyValueStore, KeyRegistry, KeyValueStore,
    LmdbKeyValueStore, LmdbStoreError, ScenarioCache, ScenarioScope,
};
pub use cached_client::CachedRecordClient;
pub use schema_cache::SchemaCache;
pub use shaper::QueryShaper;
pub use store::RecordStore;

#[cfg(test)]
pub(crate) mod test_store {
    //! Describe-only record store for unit tests in this crate.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use crmcheck_core::{
        CreateResult, CrmResult, FieldProjection, MutationResult, ObjectSchema, Record,
        RecordFilter, StoreError,
    };

    use crate::store::RecordStore;

    #[derive(Default)]
    pub struct DescribeStore {
        schemas: HashMap<String, ObjectSchema>,
        describe_calls: AtomicUsize,
    }

    impl DescribeStore {
        pub fn with_schema(schema: ObjectSchema) -> Self {
            let mut schemas = HashMap::new();
            schemas.insert(schema.object_type.clone(), schema);
            Self {
                schemas,
                describe_calls: AtomicUsize::new(0),
            }
        }

        pub fn describe_calls(&self) -> usize {
            self.describe_calls.load(Ordering::SeqCst)
        }
    }

    fn unsupported(operation: &str, object_type: &str) -> crmcheck_core::CrmError {
        StoreError::RequestFailed {
            operation: operation.to_string(),
            object_type: object_type.to_string(),
            status: 501,
            message: "not supported by DescribeStore".to_string(),
        }
        .into()
    }

    #[async_trait]
    impl RecordStore for DescribeStore {
        async fn find(
            &self,
            object_type: &str,
            _filter: &RecordFilter,
            _projection: &FieldProjection,
        ) -> CrmResult<Vec<Record>> {
            Err(unsupported("find", object_type))
        }

        async fn create(&self, object_type: &str, _fields: Record) -> CrmResult<CreateResult> {
            Err(unsupported("create", object_type))
        }

        async fn update(&self, object_type: &str, _fields: Record) -> CrmResult<MutationResult> {
            Err(unsupported("update", object_type))
        }

        async fn delete(&self, object_type: &str, _id: &str) -> CrmResult<MutationResult> {
            Err(unsupported("delete", object_type))
        }

        async fn describe(&self, object_type: &str) -> CrmResult<ObjectSchema> {
            self.describe_calls.fetch_add(1, Ordering::SeqCst);
            self.schemas.get(object_type).cloned().ok_or_else(|| {
                StoreError::NotFound {
                    object_type: "sobject".to_string(),
                    id: object_type.to_string(),
                }
                .into()
            })
        }
    }
}
