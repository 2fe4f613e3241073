//! Notas AI Core - Template Types, Errors and Cache Configuration
//!
//! Shared vocabulary for the template cache and the code that sits in front
//! of the template persistence backend.

pub mod config;
pub mod error;
pub mod template;

pub use config::CacheConfig;
pub use error::{
    CacheError, CacheResult, ConfigError, NotasError, NotasResult, RepositoryError, StoreError,
    ValidationError,
};
pub use template::{
    CacheableTemplate, Template, MAX_TEMPLATE_CONTENT_LENGTH, MAX_TEMPLATE_NAME_LENGTH,
    MIN_TEMPLATE_NAME_LENGTH,
};

/// Timestamp type used throughout the workspace.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
