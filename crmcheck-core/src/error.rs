//! Error types for crmcheck operations

use thiserror::Error;

/// Errors raised by the remote record store.
///
/// These are passed through the record-access layer unchanged; the caller
/// decides how they map onto a step outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{operation} on {object_type} failed with status {status}: {message}")]
    RequestFailed {
        operation: String,
        object_type: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response to {operation}: {reason}")]
    InvalidResponse { operation: String, reason: String },

    #[error("Record not found: {object_type} with id {id}")]
    NotFound { object_type: String, id: String },
}

/// Schema describe errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Failed to describe {object_type}: {reason}")]
    FetchFailed { object_type: String, reason: String },
}

/// Key-value cache backend errors.
///
/// Never surfaced past the read-through wrapper; a cache fault is logged and
/// treated as a miss.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend {operation} failed: {reason}")]
    Backend { operation: String, reason: String },

    #[error("Serialization error: {reason}")]
    Serialization { reason: String },

    #[error("Deserialization error for {key}: {reason}")]
    Deserialization { key: String, reason: String },
}

/// Assertion input errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssertionError {
    #[error("Unknown operator '{operator}'. Valid operators are: {valid}")]
    UnknownOperator { operator: String, valid: String },

    #[error("Invalid operand for '{operator}': {reason}")]
    InvalidOperand { operator: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all crmcheck errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CrmError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Assertion error: {0}")]
    Assertion(#[from] AssertionError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl CrmError {
    /// True for errors caused by the test author rather than a remote failure.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, CrmError::Assertion(_) | CrmError::Config(_))
    }
}

/// Result type alias for crmcheck operations.
pub type CrmResult<T> = Result<T, CrmError>;

/// Result type alias for cache backend operations.
pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// TESTS
// =============================================================================
