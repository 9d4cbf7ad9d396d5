//! Record store capability trait.
//!
//! A single generic interface over named object types. Per-entity
//! conveniences live on [`crate::CachedRecordClient`] and are built on top of
//! these operations, never beside them.

use async_trait::async_trait;
use crmcheck_core::{
    CreateResult, CrmResult, FieldProjection, MutationResult, ObjectSchema, Record, RecordFilter,
};

/// Async access to the remote record store.
///
/// Implementations report every remote failure as `CrmError::Store`; callers
/// above this trait pass those errors through unchanged.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Find all records of `object_type` matching `filter`.
    async fn find(
        &self,
        object_type: &str,
        filter: &RecordFilter,
        projection: &FieldProjection,
    ) -> CrmResult<Vec<Record>>;

    /// Find the first record of `object_type` matching `filter`.
    async fn find_one(
        &self,
        object_type: &str,
        filter: &RecordFilter,
        projection: &FieldProjection,
    ) -> CrmResult<Option<Record>> {
        Ok(self
            .find(object_type, filter, projection)
            .await?
            .into_iter()
            .next())
    }

    /// Create a record.
    async fn create(&self, object_type: &str, fields: Record) -> CrmResult<CreateResult>;

    /// Create several records.
    ///
    /// The default implementation creates them one at a time and stops at the
    /// first transport error; per-record rejections are reported in the results.
    async fn bulk_create(
        &self,
        object_type: &str,
        records: Vec<Record>,
    ) -> CrmResult<Vec<CreateResult>> {
        let mut results = Vec::with_capacity(records.len());
        for record in records {
            results.push(self.create(object_type, record).await?);
        }
        Ok(results)
    }

    /// Update a record. `fields` must carry the record's `Id`.
    async fn update(&self, object_type: &str, fields: Record) -> CrmResult<MutationResult>;

    /// Delete a record by id.
    async fn delete(&self, object_type: &str, id: &str) -> CrmResult<MutationResult>;

    /// Describe the fields of `object_type`.
    async fn describe(&self, object_type: &str) -> CrmResult<ObjectSchema>;
}
