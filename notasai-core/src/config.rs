//! Template cache configuration

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default entry-count ceiling.
pub const DEFAULT_MAX_SIZE: usize = 50;
/// Default entry age limit (30 minutes).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30 * 60);
/// Base storage key for the template container.
pub const DEFAULT_STORAGE_KEY: &str = "notasai_template_cache";
/// Base storage key for the usage snapshot.
pub const DEFAULT_USAGE_KEY: &str = "notasai_template_usage";
/// Current cache schema version. Bumping it invalidates every stored cache.
pub const DEFAULT_SCHEMA_VERSION: u32 = 2;

/// Configuration for the template cache.
///
/// `storage_key` and `usage_key` are base keys; the service appends
/// `_<userId>` once a user is signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of cached templates.
    pub max_size: usize,
    /// Entries written longer ago than this are excluded from reads.
    pub max_age: Duration,
    /// Base key of the template container.
    pub storage_key: String,
    /// Base key of the usage snapshot.
    pub usage_key: String,
    /// Schema version written into every container and entry.
    pub version: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            max_age: DEFAULT_MAX_AGE,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            usage_key: DEFAULT_USAGE_KEY.to_string(),
            version: DEFAULT_SCHEMA_VERSION,
        }
    }
}

/// On-disk shape of the config file. Every field is optional and falls
/// back to the default.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CacheConfigFile {
    max_size: Option<usize>,
    max_age_secs: Option<u64>,
    storage_key: Option<String>,
    usage_key: Option<String>,
    version: Option<u32>,
}

impl CacheConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry-count ceiling.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the entry age limit.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Set the base storage key.
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Set the base usage key.
    pub fn with_usage_key(mut self, key: impl Into<String>) -> Self {
        self.usage_key = key.into();
        self
    }

    /// Set the schema version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - max_size > 0
    /// - max_age is positive
    /// - both base keys are non-empty
    /// - version > 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_size".to_string(),
                value: self.max_size.to_string(),
                reason: "max_size must be greater than 0".to_string(),
            });
        }

        if self.max_age.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "max_age".to_string(),
                value: format!("{:?}", self.max_age),
                reason: "max_age must be positive".to_string(),
            });
        }

        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "storage_key".to_string(),
                value: self.storage_key.clone(),
                reason: "storage_key must not be empty".to_string(),
            });
        }

        if self.usage_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "usage_key".to_string(),
                value: self.usage_key.clone(),
                reason: "usage_key must not be empty".to_string(),
            });
        }

        if self.storage_key == self.usage_key {
            return Err(ConfigError::InvalidValue {
                field: "usage_key".to_string(),
                value: self.usage_key.clone(),
                reason: "usage_key must differ from storage_key".to_string(),
            });
        }

        if self.version == 0 {
            return Err(ConfigError::InvalidValue {
                field: "version".to_string(),
                value: self.version.to_string(),
                reason: "version must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `NOTASAI_CACHE_MAX_SIZE`: Entry-count ceiling (default: 50)
    /// - `NOTASAI_CACHE_MAX_AGE_SECS`: Entry age limit in seconds (default: 1800)
    /// - `NOTASAI_CACHE_STORAGE_KEY`: Base container key (default: notasai_template_cache)
    /// - `NOTASAI_CACHE_USAGE_KEY`: Base usage key (default: notasai_template_usage)
    /// - `NOTASAI_CACHE_VERSION`: Schema version (default: 2)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_size: std::env::var("NOTASAI_CACHE_MAX_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            max_age: std::env::var("NOTASAI_CACHE_MAX_AGE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_age),
            storage_key: std::env::var("NOTASAI_CACHE_STORAGE_KEY")
                .unwrap_or(defaults.storage_key),
            usage_key: std::env::var("NOTASAI_CACHE_USAGE_KEY").unwrap_or(defaults.usage_key),
            version: std::env::var("NOTASAI_CACHE_VERSION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.version),
        }
    }

    /// Parse a TOML document, filling missing fields with defaults, and validate it.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: CacheConfigFile = toml::from_str(contents)?;
        let defaults = Self::default();

        let config = Self {
            max_size: file.max_size.unwrap_or(defaults.max_size),
            max_age: file
                .max_age_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_age),
            storage_key: file.storage_key.unwrap_or(defaults.storage_key),
            usage_key: file.usage_key.unwrap_or(defaults.usage_key),
            version: file.version.unwrap_or(defaults.version),
        };
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
