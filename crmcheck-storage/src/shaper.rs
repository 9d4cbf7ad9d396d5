//! Schema-aware query shaping.
//!
//! The record store's transport rejects query URLs past a certain length.
//! Objects with many custom fields can exceed it with a plain "select every
//! field" query, so the shaper checks the encoded length up front and, when
//! it is too long, narrows the projection to the standard fields plus the
//! fields the caller actually needs.

use std::collections::HashSet;
use std::sync::Arc;

use crmcheck_core::{CrmResult, FieldProjection, ObjectSchema, DEFAULT_MAX_QUERY_LENGTH};
use tracing::debug;

use crate::schema_cache::SchemaCache;
use crate::store::RecordStore;

/// Decides per object type whether lookups must use a restricted projection.
#[derive(Debug, Clone)]
pub struct QueryShaper {
    schemas: Arc<SchemaCache>,
    max_query_length: usize,
}

impl QueryShaper {
    pub fn new(schemas: Arc<SchemaCache>, max_query_length: usize) -> Self {
        Self {
            schemas,
            max_query_length,
        }
    }

    /// Shaper with the default 15000-character threshold.
    pub fn with_defaults(schemas: Arc<SchemaCache>) -> Self {
        Self::new(schemas, DEFAULT_MAX_QUERY_LENGTH)
    }

    pub fn schemas(&self) -> &SchemaCache {
        &self.schemas
    }

    pub fn max_query_length(&self) -> usize {
        self.max_query_length
    }

    /// `select <every field> from <object>`, the query an unrestricted lookup
    /// would send.
    pub fn unrestricted_query(schema: &ObjectSchema) -> String {
        let fields: Vec<&str> = schema.field_names().collect();
        format!("select {} from {}", fields.join(","), schema.object_type)
    }

    /// Percent-encoded length of [`QueryShaper::unrestricted_query`].
    pub fn encoded_query_length(schema: &ObjectSchema) -> usize {
        urlencoding::encode(&Self::unrestricted_query(schema)).len()
    }

    /// True iff the encoded unrestricted query exceeds the threshold.
    pub async fn should_restrict_fields<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        object_type: &str,
    ) -> CrmResult<bool> {
        let schema = self.schemas.get_schema(store, object_type).await?;
        Ok(Self::encoded_query_length(&schema) > self.max_query_length)
    }

    /// Projection to use for a lookup on `object_type`.
    ///
    /// Returns [`FieldProjection::All`] when no restriction is needed,
    /// otherwise the deduplicated union of `always_include` and the object's
    /// standard fields.
    pub async fn project_fields<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        object_type: &str,
        always_include: &[String],
    ) -> CrmResult<FieldProjection> {
        let schema = self.schemas.get_schema(store, object_type).await?;
        let encoded_length = Self::encoded_query_length(&schema);
        if encoded_length <= self.max_query_length {
            return Ok(FieldProjection::All);
        }

        let mut seen = HashSet::new();
        let fields: Vec<String> = always_include
            .iter()
            .map(String::as_str)
            .chain(schema.standard_fields())
            .filter(|name| seen.insert(*name))
            .map(str::to_string)
            .collect();

        debug!(
            object_type,
            encoded_length,
            field_count = fields.len(),
            "Restricting field projection"
        );
        Ok(FieldProjection::Only(fields))
    }
}
