//! Comparison service configuration.
//!
//! This module provides the `ServiceConfig` struct describing where the
//! comparison service lives and how long setup operations may take.

use crate::error::{DbCompareError, Result, redact_url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default base URL of the comparison service
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8080/api/";

/// Default bound for a single probe or discovery request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of rows the service may return per catalog request
pub const DEFAULT_ROW_LIMIT: u32 = 1000;

/// Settings for talking to the comparison service.
///
/// # Example
/// ```rust
/// use dbcompare_core::config::ServiceConfig;
/// use std::time::Duration;
///
/// let config = ServiceConfig::new("http://compare.internal:8080/api/")
///     .with_probe_timeout(Duration::from_secs(10))
///     .with_row_limit(500);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL that all routes are joined onto
    pub base_url: String,
    /// Bound for each connectivity check
    pub probe_timeout: Duration,
    /// Bound for each table listing or catalog query
    pub discovery_timeout: Duration,
    /// Row cap sent with catalog requests
    pub row_limit: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_URL.to_string(),
            probe_timeout: DEFAULT_TIMEOUT,
            discovery_timeout: DEFAULT_TIMEOUT,
            row_limit: DEFAULT_ROW_LIMIT,
        }
    }
}

impl std::fmt::Display for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ServiceConfig({}, probe {}s, discovery {}s, {} rows)",
            redact_url(&self.base_url),
            self.probe_timeout.as_secs(),
            self.discovery_timeout.as_secs(),
            self.row_limit
        )
    }
}

impl ServiceConfig {
    /// Creates a config for the given base URL with default bounds.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the probe bound.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Builder method to set the discovery bound.
    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Builder method to set both bounds at once.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_probe_timeout(timeout)
            .with_discovery_timeout(timeout)
    }

    /// Builder method to set the row cap.
    pub fn with_row_limit(mut self, row_limit: u32) -> Self {
        self.row_limit = row_limit;
        self
    }

    /// Parses the base URL, guaranteeing a trailing slash so relative
    /// routes join under it rather than replacing its last segment.
    ///
    /// # Errors
    /// Returns `Configuration` if the URL does not parse or is not HTTP(S).
    pub fn base(&self) -> Result<Url> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw).map_err(|e| {
            DbCompareError::configuration(format!(
                "invalid service URL '{}': {e}",
                redact_url(&self.base_url)
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DbCompareError::configuration(format!(
                "service URL must use http or https, got '{}'",
                url.scheme()
            )));
        }
        Ok(url)
    }

    /// Validates configuration parameters.
    ///
    /// # Errors
    /// Returns error if the URL is unusable or a bound or limit is zero
    pub fn validate(&self) -> Result<()> {
        self.base()?;

        if self.probe_timeout.is_zero() {
            return Err(DbCompareError::configuration(
                "probe_timeout must be greater than 0",
            ));
        }

        if self.discovery_timeout.is_zero() {
            return Err(DbCompareError::configuration(
                "discovery_timeout must be greater than 0",
            ));
        }

        if self.row_limit == 0 {
            return Err(DbCompareError::configuration(
                "row_limit must be greater than 0",
            ));
        }

        Ok(())
    }
}
