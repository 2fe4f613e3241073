//! Read-through / write-through wrapper around the template backend.
//!
//! The backend stays the source of truth. Reads are served from the cache
//! when it has a fresh copy. A successful backend write is mirrored into the
//! cache only while the cache holds the user's list; otherwise the cache is
//! invalidated so the next `list` goes to the backend. Backend errors
//! propagate; cache failures never do.

use std::sync::Arc;

use notasai_core::{NotasResult, Template, ValidationError};
use tracing::debug;

use super::freshness::CacheRead;
use super::service::TemplateCacheService;
use crate::store::KeyValueStore;

/// Template persistence backend.
pub trait TemplateRepository: Send + Sync {
    /// All templates owned by `user_id`.
    fn list_templates(&self, user_id: &str) -> NotasResult<Vec<Template>>;

    /// Persist a new template and return the stored record.
    fn create_template(&self, template: &Template) -> NotasResult<Template>;

    /// Persist changes to an existing template and return the stored record.
    fn update_template(&self, template: &Template) -> NotasResult<Template>;

    fn delete_template(&self, template_id: &str) -> NotasResult<()>;
}

/// A [`TemplateRepository`] fronted by a [`TemplateCacheService`].
///
/// # Example
///
/// ```ignore
/// let mut templates = CachedTemplateRepository::new(backend, cache);
/// let read = templates.list("user-1")?;
/// if read.was_cache_miss() {
///     tracing::debug!("templates loaded from backend");
/// }
/// ```
pub struct CachedTemplateRepository<R, S>
where
    R: TemplateRepository,
    S: KeyValueStore + ?Sized,
{
    repository: Arc<R>,
    cache: TemplateCacheService<S>,
}

impl<R, S> CachedTemplateRepository<R, S>
where
    R: TemplateRepository,
    S: KeyValueStore + ?Sized,
{
    pub fn new(repository: Arc<R>, cache: TemplateCacheService<S>) -> Self {
        Self { repository, cache }
    }

    pub fn cache(&self) -> &TemplateCacheService<S> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut TemplateCacheService<S> {
        &mut self.cache
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Scope the cache to `user_id`.
    pub fn sign_in(&mut self, user_id: &str) {
        self.cache.set_user(user_id);
    }

    /// Return the cache to its unscoped keys.
    pub fn sign_out(&mut self) {
        self.cache.clear_user();
    }

    /// Templates of `user_id`, from the cache when it has a fresh copy.
    ///
    /// On a miss the backend list is written back into the cache.
    pub fn list(&mut self, user_id: &str) -> NotasResult<CacheRead<Vec<Template>>> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "user_id".to_string(),
            }
            .into());
        }
        if self.cache.user_id() != Some(user_id) {
            self.cache.set_user(user_id);
        }

        if let Some(templates) = self.cache.get_templates() {
            return Ok(CacheRead::from_cache(templates));
        }

        let templates = self.repository.list_templates(user_id)?;
        debug!(user_id, count = templates.len(), "templates loaded from backend");
        self.cache.set_templates(&templates);
        Ok(CacheRead::from_backend(templates))
    }

    /// Drop the cached copy and list again from the backend.
    pub fn refresh(&mut self, user_id: &str) -> NotasResult<CacheRead<Vec<Template>>> {
        self.cache.invalidate();
        self.list(user_id)
    }

    pub fn create(&self, template: &Template) -> NotasResult<Template> {
        template.validate()?;
        let created = self.repository.create_template(template)?;
        self.mirror(|cache| cache.add_template(&created));
        Ok(created)
    }

    pub fn update(&self, template: &Template) -> NotasResult<Template> {
        template.validate()?;
        let updated = self.repository.update_template(template)?;
        self.mirror(|cache| cache.update_template(&updated));
        Ok(updated)
    }

    pub fn delete(&self, template_id: &str) -> NotasResult<()> {
        self.repository.delete_template(template_id)?;
        self.cache.remove_template(template_id);
        Ok(())
    }

    /// Record that the user opened `template_id`.
    pub fn open(&self, template_id: &str) {
        self.cache.record_template_access(template_id);
    }

    /// Apply a backend write to the cache if it holds a fresh list to apply
    /// it to.
    ///
    /// A cold or expired cache would otherwise end up holding just the
    /// written template and serve it as the whole list.
    fn mirror(&self, write: impl FnOnce(&TemplateCacheService<S>)) {
        if self.cache.get_templates().is_some() {
            write(&self.cache);
        } else {
            debug!("cache cold, invalidating instead of mirroring write");
            self.cache.invalidate();
        }
    }
}
