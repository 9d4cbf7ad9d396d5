//! REST client configuration

use std::time::Duration;

use crmcheck_core::{ConfigError, CrmError, CrmResult};

/// REST API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "59.0";

/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Requests allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;

/// Connection settings for [`crate::RestRecordStore`].
///
/// The access token is taken as given; obtaining one is the caller's job.
#[derive(Clone, PartialEq, Eq)]
pub struct RestClientConfig {
    /// Instance base URL, e.g. `https://example.my.salesforce.com`.
    pub instance_url: String,
    /// API version without the leading `v`.
    pub api_version: String,
    pub access_token: String,
    pub timeout: Duration,
    pub max_concurrent_requests: usize,
}

impl RestClientConfig {
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            instance_url: instance_url.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            access_token: access_token.into(),
            timeout: DEFAULT_TIMEOUT,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max;
        self
    }

    /// Create from environment variables.
    ///
    /// Environment variables:
    /// - `CRMCHECK_INSTANCE_URL`: instance base URL (required)
    /// - `CRMCHECK_ACCESS_TOKEN`: bearer token (required)
    /// - `CRMCHECK_API_VERSION`: API version (default: 59.0)
    /// - `CRMCHECK_HTTP_TIMEOUT_SECS`: request timeout in seconds (default: 30)
    pub fn from_env() -> CrmResult<Self> {
        let required = |field: &str| {
            std::env::var(field)
                .ok()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    CrmError::Config(ConfigError::MissingRequired {
                        field: field.to_string(),
                    })
                })
        };

        let mut config = Self::new(
            required("CRMCHECK_INSTANCE_URL")?,
            required("CRMCHECK_ACCESS_TOKEN")?,
        );
        if let Some(version) = std::env::var("CRMCHECK_API_VERSION")
            .ok()
            .filter(|s| !s.is_empty())
        {
            config.api_version = version;
        }
        if let Some(secs) = std::env::var("CRMCHECK_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> CrmResult<()> {
        let invalid = |field: &str, value: String, reason: &str| {
            Err(CrmError::Config(ConfigError::InvalidValue {
                field: field.to_string(),
                value,
                reason: reason.to_string(),
            }))
        };

        if !(self.instance_url.starts_with("https://") || self.instance_url.starts_with("http://"))
        {
            return invalid(
                "instance_url",
                self.instance_url.clone(),
                "instance_url must be an http(s) URL",
            );
        }
        if self.access_token.is_empty() {
            return Err(CrmError::Config(ConfigError::MissingRequired {
                field: "access_token".to_string(),
            }));
        }
        if self.api_version.is_empty()
            || !self
                .api_version
                .chars()
                .all(|c| c.is_ascii_digit() || c == '.')
        {
            return invalid(
                "api_version",
                self.api_version.clone(),
                "api_version must look like 59.0",
            );
        }
        if self.timeout.is_zero() {
            return invalid(
                "timeout",
                format!("{:?}", self.timeout),
                "timeout must be greater than 0",
            );
        }
        if self.max_concurrent_requests == 0 {
            return invalid(
                "max_concurrent_requests",
                "0".to_string(),
                "max_concurrent_requests must be greater than 0",
            );
        }
        Ok(())
    }

    /// `<instance>/services/data/v<version>`
    pub fn base_url(&self) -> String {
        format!(
            "{}/services/data/v{}",
            self.instance_url.trim_end_matches('/'),
            self.api_version
        )
    }
}

impl std::fmt::Debug for RestClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClientConfig")
            .field("instance_url", &self.instance_url)
            .field("api_version", &self.api_version)
            .field("access_token", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .finish()
    }
}
