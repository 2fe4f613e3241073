//! Error types for Notas AI operations

use thiserror::Error;

/// Key-value store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Persistent storage is not available in this context")]
    Unavailable,

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Store backend failed: {reason}")]
    Backend { reason: String },
}

/// Template cache errors.
///
/// These never cross the public boundary of the cache service; they are
/// converted into safe defaults there. [`CacheError`] is still exposed so
/// the degraded paths can be inspected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Template cache is not available in this context")]
    Unavailable,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Corrupt cache value under {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Cache version mismatch under {key}: found {found:?}, expected {expected}")]
    VersionMismatch {
        key: String,
        found: Option<u32>,
        expected: u32,
    },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization {
            reason: e.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Template validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Field {field} is too long: {actual} characters, max {max}")]
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },
}

/// Template persistence backend errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Template not found: {id}")]
    NotFound { id: String },

    #[error("Template backend failed: {reason}")]
    Backend { reason: String },
}

/// Master error type for Notas AI operations.
#[derive(Debug, Error)]
pub enum NotasError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result type alias for cache internals.
pub type CacheResult<T> = Result<T, CacheError>;

/// Result type alias for Notas AI operations.
pub type NotasResult<T> = Result<T, NotasError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_display_version_mismatch() {
        let err = CacheError::VersionMismatch {
            key: "notasai_template_cache_u1".to_string(),
            found: Some(1),
            expected: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("version mismatch"));
        assert!(msg.contains("notasai_template_cache_u1"));
        assert!(msg.contains("expected 2"));
    }

    #[test]
    fn test_cache_error_from_store_error() {
        let err = CacheError::from(StoreError::LockPoisoned);
        assert_eq!(err, CacheError::Store(StoreError::LockPoisoned));
    }

    #[test]
    fn test_cache_error_from_serde_json() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err = CacheError::from(parse.expect_err("invalid json must fail"));
        assert!(matches!(err, CacheError::Serialization { .. }));
    }

    #[test]
    fn test_validation_error_display_too_long() {
        let err = ValidationError::TooLong {
            field: "name".to_string(),
            max: 100,
            actual: 140,
        };
        let msg = err.to_string();
        assert!(msg.contains("name"));
        assert!(msg.contains("140"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_notas_error_from_variants() {
        let cache = NotasError::from(CacheError::Unavailable);
        assert!(matches!(cache, NotasError::Cache(_)));

        let validation = NotasError::from(ValidationError::RequiredFieldMissing {
            field: "name".to_string(),
        });
        assert!(matches!(validation, NotasError::Validation(_)));

        let repository = NotasError::from(RepositoryError::NotFound {
            id: "t-1".to_string(),
        });
        assert!(matches!(repository, NotasError::Repository(_)));

        let config = NotasError::from(ConfigError::InvalidValue {
            field: "max_size".to_string(),
            value: "0".to_string(),
            reason: "must be greater than 0".to_string(),
        });
        assert!(matches!(config, NotasError::Config(_)));
    }
}
