//! Per-connection schema cache.
//!
//! Holds the describe result for every object type seen on one record-store
//! connection. Entries never expire: the schema is assumed static for the
//! duration of a run.
//!
//! Two concurrent first lookups for the same type may both call describe.
//! Both results are identical, so the second insert simply overwrites the
//! first.

use std::collections::HashMap;
use std::sync::Arc;

use crmcheck_core::{CrmResult, ObjectSchema, SchemaError};
use tracing::debug;

use crate::store::RecordStore;

/// Object type name to field schema, populated on first use.
#[derive(Debug, Default)]
pub struct SchemaCache {
    schemas: tokio::sync::RwLock<HashMap<String, Arc<ObjectSchema>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached schema for `object_type`, describing it on first use.
    ///
    /// # Errors
    ///
    /// A describe failure is returned as `CrmError::Schema` and nothing is
    /// cached; the next call describes again.
    pub async fn get_schema<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        object_type: &str,
    ) -> CrmResult<Arc<ObjectSchema>> {
        if let Some(schema) = self.schemas.read().await.get(object_type) {
            return Ok(Arc::clone(schema));
        }

        debug!(object_type, "Describing object schema");
        let schema = store
            .describe(object_type)
            .await
            .map_err(|e| SchemaError::FetchFailed {
                object_type: object_type.to_string(),
                reason: e.to_string(),
            })?;
        let schema = Arc::new(schema);

        self.schemas
            .write()
            .await
            .insert(object_type.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Cached schema for `object_type`, without describing.
    pub async fn cached(&self, object_type: &str) -> Option<Arc<ObjectSchema>> {
        self.schemas.read().await.get(object_type).cloned()
    }

    /// Number of object types cached.
    pub async fn len(&self) -> usize {
        self.schemas.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.schemas.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_store::DescribeStore;
    use crmcheck_core::{CrmError, FieldDescriptor};

    fn lead_schema() -> ObjectSchema {
        ObjectSchema::new(
            "Lead",
            vec![
                FieldDescriptor::standard("Id"),
                FieldDescriptor::standard("Email"),
                FieldDescriptor::custom("Score__c"),
            ],
        )
    }

    #[tokio::test]
    async fn test_describes_once_then_serves_cached() {
        let store = DescribeStore::with_schema(lead_schema());
        let cache = SchemaCache::new();

        let first = cache.get_schema(&store, "Lead").await.unwrap();
        let second = cache.get_schema(&store, "Lead").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.describe_calls(), 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.cached("Lead").await.is_some());
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let store = DescribeStore::default();
        let cache = SchemaCache::new();

        for _ in 0..2 {
            let err = cache.get_schema(&store, "Widget__c").await.unwrap_err();
            match err {
                CrmError::Schema(SchemaError::FetchFailed { object_type, .. }) => {
                    assert_eq!(object_type, "Widget__c");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(store.describe_calls(), 2);
        assert!(cache.is_empty().await);
        assert!(cache.cached("Widget__c").await.is_none());
    }
}
