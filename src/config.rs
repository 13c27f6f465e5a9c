//! Controller configuration
//!
//! `ControllerConfig` holds the tunables of a pagination controller. It can be
//! built in code or loaded from YAML/JSON:
//!
//! ```yaml
//! limit: 25
//! stale_time_ms: 60000
//! filters:
//!   status: open
//! retry:
//!   max_attempts: 5
//! ```

use crate::cache::CacheOptions;
use crate::error::{Error, Result};
use crate::fetch::RetryPolicy;
use crate::pagination::DEFAULT_LIMIT;
use crate::types::Filters;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Controller Config
// ============================================================================

/// Tunables for one pagination controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Page size
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// How long a cached page counts as fresh, in milliseconds
    #[serde(default = "default_stale_time_ms")]
    pub stale_time_ms: u64,

    /// How long an unused cached page is retained, in milliseconds
    #[serde(default = "default_cache_time_ms")]
    pub cache_time_ms: u64,

    /// Initial filters
    #[serde(default)]
    pub filters: Option<Filters>,

    /// Quiet period before a filter change is committed, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Slice an over-sized initial payload into local pages
    #[serde(default = "default_true")]
    pub enable_virtual_pages: bool,

    /// Fetch the next page in the background once the current one settles
    #[serde(default = "default_true")]
    pub prefetch: bool,

    /// Retry policy for foreground fetches
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            stale_time_ms: default_stale_time_ms(),
            cache_time_ms: default_cache_time_ms(),
            filters: None,
            debounce_ms: default_debounce_ms(),
            enable_virtual_pages: true,
            prefetch: true,
            retry: RetryPolicy::default(),
        }
    }
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

fn default_stale_time_ms() -> u64 {
    300_000
}

fn default_cache_time_ms() -> u64 {
    600_000
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

impl ControllerConfig {
    /// Create a new config builder
    pub fn builder() -> ControllerConfigBuilder {
        ControllerConfigBuilder::default()
    }

    /// Parse from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.json` files are parsed as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            }
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Check the values are usable
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(Error::invalid_value("limit", "must be greater than zero"));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::invalid_value(
                "retry.max_attempts",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Freshness window
    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_ms)
    }

    /// Retention window
    pub fn cache_time(&self) -> Duration {
        Duration::from_millis(self.cache_time_ms)
    }

    /// Filter debounce delay
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Cache options for pages written by the controller
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions::new(self.stale_time(), self.cache_time())
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ControllerConfig`]
#[derive(Debug, Default)]
pub struct ControllerConfigBuilder {
    config: ControllerConfig,
}

impl ControllerConfigBuilder {
    /// Set the page size
    pub fn limit(mut self, limit: u32) -> Self {
        self.config.limit = limit;
        self
    }

    /// Set the freshness window
    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.config.stale_time_ms = millis(stale_time);
        self
    }

    /// Set the retention window
    pub fn cache_time(mut self, cache_time: Duration) -> Self {
        self.config.cache_time_ms = millis(cache_time);
        self
    }

    /// Set the initial filters
    pub fn filters(mut self, filters: Filters) -> Self {
        self.config.filters = Some(filters);
        self
    }

    /// Set the filter debounce delay
    pub fn debounce(mut self, delay: Duration) -> Self {
        self.config.debounce_ms = millis(delay);
        self
    }

    /// Enable or disable virtual pages
    pub fn virtual_pages(mut self, enabled: bool) -> Self {
        self.config.enable_virtual_pages = enabled;
        self
    }

    /// Enable or disable next-page prefetch
    pub fn prefetch(mut self, enabled: bool) -> Self {
        self.config.prefetch = enabled;
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    /// Build the config
    pub fn build(self) -> ControllerConfig {
        self.config
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
