//! crmcheck Client - REST Record Store
//!
//! [`RestRecordStore`] implements [`crmcheck_storage::RecordStore`] against a
//! Salesforce-style REST API: describe, query, create, update, delete, and
//! composite bulk create. It expects an access token that was obtained
//! elsewhere.

pub mod config;
pub mod soql;
pub mod store;
pub mod types;

pub use config::{
    RestClientConfig, DEFAULT_API_VERSION, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_TIMEOUT,
};
pub use store::{RestRecordStore, COMPOSITE_BATCH_SIZE};
