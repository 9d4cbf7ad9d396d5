//! Scenario-scoped caching over an external key-value store.
//!
//! Entries are JSON strings with a fixed TTL, keyed by
//! `<ProviderTag>|<EntityType>|<Discriminator>|<Scope>`. Each scope keeps a
//! [`KeyRegistry`] of the keys it wrote so the whole scope can be invalidated
//! at once.
//!
//! Isolation between scenario executions comes from the scope segment of
//! each key, not from locking. Two executions that share a scenario id and a
//! requestor id share a cache.
//!
//! # Example
//!
//! ```ignore
//! let cache = ScenarioCache::new(store, ScenarioScope::new("scn", "req"), CacheSettings::default());
//! let key = cache.key_for(&EntityKind::Contact, &Discriminator::email("a@b.c"));
//! cache.set(&key, &Some(record)).await?;
//! cache.clear().await?;
//! ```

pub mod lmdb_backend;
pub mod memory;
pub mod read_through;
pub mod registry;
pub mod scope_key;
pub mod traits;

pub use lmdb_backend::{LmdbKeyValueStore, LmdbStoreError};
pub use memory::InMemoryKeyValueStore;
pub use read_through::ScenarioCache;
pub use registry::KeyRegistry;
pub use scope_key::{CacheKey, Discriminator, ScenarioScope};
pub use traits::{CacheableValue, KeyValueStore};
