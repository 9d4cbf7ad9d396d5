//! Configuration types

use crate::error::{ConfigError, CrmError, CrmResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Provider tag used as the first segment of every cache key.
pub const DEFAULT_PROVIDER_TAG: &str = "Salesforce";

/// Time-to-live applied to cached records and the key registry.
pub const DEFAULT_ENTRY_TTL: Duration = Duration::from_secs(55);

/// Percent-encoded query length above which field projection is restricted.
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 15_000;

/// Settings for the scenario-scoped read-through cache and query shaper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// First segment of every cache key.
    pub provider_tag: String,
    /// TTL for data entries and the key registry entry.
    pub entry_ttl: Duration,
    /// Encoded "select all fields" length that triggers a restricted projection.
    pub max_query_length: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            provider_tag: DEFAULT_PROVIDER_TAG.to_string(),
            entry_ttl: DEFAULT_ENTRY_TTL,
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
        }
    }
}

impl CacheSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider tag.
    pub fn with_provider_tag(mut self, tag: impl Into<String>) -> Self {
        self.provider_tag = tag.into();
        self
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }

    /// Set the query length threshold.
    pub fn with_max_query_length(mut self, length: usize) -> Self {
        self.max_query_length = length;
        self
    }

    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `CRMCHECK_PROVIDER_TAG`: cache key provider tag (default: Salesforce)
    /// - `CRMCHECK_CACHE_TTL_SECS`: entry TTL in seconds (default: 55)
    /// - `CRMCHECK_MAX_QUERY_LENGTH`: restriction threshold (default: 15000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            provider_tag: std::env::var("CRMCHECK_PROVIDER_TAG")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.provider_tag),
            entry_ttl: std::env::var("CRMCHECK_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.entry_ttl),
            max_query_length: std::env::var("CRMCHECK_MAX_QUERY_LENGTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_query_length),
        }
    }

    /// Validate the settings.
    ///
    /// Validates:
    /// - provider_tag is non-empty and contains no `|` (the key separator)
    /// - entry_ttl is at least one second
    /// - max_query_length > 0
    pub fn validate(&self) -> CrmResult<()> {
        if self.provider_tag.is_empty() || self.provider_tag.contains('|') {
            return Err(CrmError::Config(ConfigError::InvalidValue {
                field: "provider_tag".to_string(),
                value: self.provider_tag.clone(),
                reason: "provider_tag must be non-empty and must not contain '|'".to_string(),
            }));
        }

        if self.entry_ttl.as_secs() == 0 {
            return Err(CrmError::Config(ConfigError::InvalidValue {
                field: "entry_ttl".to_string(),
                value: format!("{:?}", self.entry_ttl),
                reason: "entry_ttl must be at least one second".to_string(),
            }));
        }

        if self.max_query_length == 0 {
            return Err(CrmError::Config(ConfigError::InvalidValue {
                field: "max_query_length".to_string(),
                value: self.max_query_length.to_string(),
                reason: "max_query_length must be greater than 0".to_string(),
            }));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CacheSettings::default();
        assert_eq!(settings.provider_tag, "Salesforce");
        assert_eq!(settings.entry_ttl, Duration::from_secs(55));
        assert_eq!(settings.max_query_length, 15_000);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let settings = CacheSettings::new()
            .with_provider_tag("Hubspot")
            .with_ttl(Duration::from_secs(10))
            .with_max_query_length(2000);

        assert_eq!(settings.provider_tag, "Hubspot");
        assert_eq!(settings.entry_ttl, Duration::from_secs(10));
        assert_eq!(settings.max_query_length, 2000);
    }

    #[test]
    fn test_validate_rejects_separator_in_tag() {
        let settings = CacheSettings::new().with_provider_tag("a|b");
        let err = settings.validate().unwrap_err();
        assert!(matches!(
            err,
            CrmError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "provider_tag"
        ));
    }

    #[test]
    fn test_validate_rejects_sub_second_ttl() {
        let settings = CacheSettings::new().with_ttl(Duration::from_millis(500));
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_query_length() {
        let settings = CacheSettings::new().with_max_query_length(0);
        assert!(settings.validate().is_err());
    }
}
