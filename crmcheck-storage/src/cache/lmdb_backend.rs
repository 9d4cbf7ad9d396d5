//! LMDB-backed key-value store with per-entry expiry.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a memory-mapped
//! store that survives process restarts, so several host processes on one
//! machine can share scenario caches.
//!
//! # Value Layout
//!
//! `[expires_at: i64 unix millis, little endian][utf-8 payload]`
//!
//! Expired entries read as absent; [`LmdbKeyValueStore::purge_expired`]
//! reclaims their space.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use crmcheck_core::{CacheError, CacheResult};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use super::traits::KeyValueStore;

/// Width of the expiry header.
const EXPIRY_BYTES: usize = 8;

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Stored bytes did not match the value layout.
    #[error("Corrupt entry for {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for CacheError {
    fn from(e: LmdbStoreError) -> Self {
        match e {
            LmdbStoreError::Corrupt { key, reason } => CacheError::Deserialization { key, reason },
            other => CacheError::Backend {
                operation: "lmdb".to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Whole milliseconds in `d`, saturating at `i64::MAX`.
fn saturating_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(saturating_millis)
        .unwrap_or(0)
}

fn encode_entry(value: &str, expires_at: i64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(EXPIRY_BYTES + value.len());
    bytes.extend_from_slice(&expires_at.to_le_bytes());
    bytes.extend_from_slice(value.as_bytes());
    bytes
}

fn decode_expiry(bytes: &[u8]) -> Option<i64> {
    let header: [u8; EXPIRY_BYTES] = bytes.get(..EXPIRY_BYTES)?.try_into().ok()?;
    Some(i64::from_le_bytes(header))
}

/// LMDB-backed key-value store.
///
/// # Example
///
/// ```ignore
/// use crmcheck_storage::cache::{KeyValueStore, LmdbKeyValueStore};
/// use std::time::Duration;
///
/// let store = LmdbKeyValueStore::new("/tmp/crmcheck-cache", 64)?;
/// store.set_ex("k", Duration::from_secs(55), "{}").await?;
/// ```
pub struct LmdbKeyValueStore {
    env: Env,
    db: Database<Bytes, Bytes>,
}

impl LmdbKeyValueStore {
    /// Open (or create) a store under `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(Self { env, db })
    }

    fn read(&self, key: &str) -> Result<Option<String>, LmdbStoreError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let Some(bytes) = self
            .db
            .get(&rtxn, key.as_bytes())
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?
        else {
            return Ok(None);
        };

        let expires_at = decode_expiry(bytes).ok_or_else(|| LmdbStoreError::Corrupt {
            key: key.to_string(),
            reason: "missing expiry header".to_string(),
        })?;
        if expires_at <= now_millis() {
            return Ok(None);
        }

        let value = std::str::from_utf8(&bytes[EXPIRY_BYTES..]).map_err(|e| {
            LmdbStoreError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Some(value.to_string()))
    }

    fn write(&self, key: &str, ttl: Duration, value: &str) -> Result<(), LmdbStoreError> {
        let expires_at = now_millis().saturating_add(saturating_millis(ttl));
        let entry = encode_entry(value, expires_at);

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        self.db
            .put(&mut wtxn, key.as_bytes(), &entry)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), LmdbStoreError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        self.db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))
    }

    /// Delete every expired (or unreadable) entry, returning how many were removed.
    pub fn purge_expired(&self) -> Result<u64, LmdbStoreError> {
        let now = now_millis();
        let expired: Vec<Vec<u8>> = {
            let rtxn = self
                .env
                .read_txn()
                .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
            let iter = self
                .db
                .iter(&rtxn)
                .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

            let mut keys = Vec::new();
            for result in iter {
                let Ok((key, value)) = result else { continue };
                if decode_expiry(value).map_or(true, |expires_at| expires_at <= now) {
                    keys.push(key.to_vec());
                }
            }
            keys
        };

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        let mut removed = 0u64;
        for key in &expired {
            if self
                .db
                .delete(&mut wtxn, key)
                .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?
            {
                removed += 1;
            }
        }
        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(removed)
    }
}

#[async_trait]
impl KeyValueStore for LmdbKeyValueStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.read(key)?)
    }

    async fn set_ex(&self, key: &str, ttl: Duration, value: &str) -> CacheResult<()> {
        Ok(self.write(key, ttl, value)?)
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        Ok(self.remove(key)?)
    }
}
