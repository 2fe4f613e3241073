//! Versioned, size-bounded LRU template cache.
//!
//! All cached templates of one user live in a single JSON container stored
//! under a per-user key. The container carries a schema version; a container
//! written under any other version is dropped wholesale, never migrated.
//!
//! # Failure Model
//!
//! The cache is an accelerator, not a source of truth. Every public
//! operation on [`TemplateCacheService`] converts failures into a safe
//! default (`None`, an empty list, `false`, or a no-op) and logs them.
//! Callers fall back to the template backend on a miss.
//!
//! # Example
//!
//! ```ignore
//! let mut cache: TemplateCacheService<MemoryStore> =
//!     TemplateCacheService::new(Arc::new(MemoryStore::new()));
//! cache.set_user("user-1");
//!
//! match cache.get_templates() {
//!     Some(templates) => render(templates),
//!     None => {
//!         let templates = backend.list_templates("user-1")?;
//!         cache.set_templates(&templates);
//!     }
//! }
//! ```

pub mod cleanup;
pub mod container;
pub mod freshness;
pub mod lru;
pub mod namespace;
pub mod read_through;
pub mod service;
pub mod stats;

pub use cleanup::CleanupReport;
pub use container::{CacheContainer, CacheEntry, UsageRecord};
pub use freshness::CacheRead;
pub use namespace::UserScopedKey;
pub use read_through::{CachedTemplateRepository, TemplateRepository};
pub use service::{TemplateCacheService, DEFAULT_MOST_USED_LIMIT};
pub use stats::{CacheStatsSummary, MostUsedTemplate, TemplateCacheStats};
