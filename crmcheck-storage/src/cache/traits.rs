//! Key-value store trait and cacheable value marker.
//!
//! This module defines the traits that must be implemented by cache backends
//! and by values that the read-through wrapper is allowed to cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crmcheck_core::{CacheResult, Record};
use serde::{de::DeserializeOwned, Serialize};

/// Key-value cache backend with per-entry expiry.
///
/// Any store offering get, set-with-expiry and delete satisfies this
/// (Redis `GET`/`SETEX`/`DEL`, LMDB, an in-process map). Values are opaque
/// strings; the cache layer stores JSON in them.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a value, or `None` if absent or expired.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a value that expires after `ttl`.
    async fn set_ex(&self, key: &str, ttl: Duration, value: &str) -> CacheResult<()>;

    /// Delete a value. Deleting an absent key is not an error.
    async fn del(&self, key: &str) -> CacheResult<()>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set_ex(&self, key: &str, ttl: Duration, value: &str) -> CacheResult<()> {
        (**self).set_ex(key, ttl, value).await
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        (**self).del(key).await
    }
}

/// Marker trait for lookup results the read-through wrapper may cache.
///
/// Only present (non-empty) results are written; a miss from the record
/// store is never cached, so a record created later in the scenario is
/// found on the next lookup.
pub trait CacheableValue: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// True if this value should be written to the cache.
    fn is_present(&self) -> bool;
}

impl CacheableValue for Vec<Record> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_list_presence() {
        assert!(!Vec::<Record>::new().is_present());
        assert!(vec![Record::new()].is_present());
    }
}
