//! Cache statistics and the read-mostly statistics accessor.

use std::fmt;

use indexmap::IndexMap;
use notasai_core::{CacheableTemplate, Template};

use super::container::CacheEntry;
use super::service::{TemplateCacheService, DEFAULT_MOST_USED_LIMIT};
use crate::store::KeyValueStore;

/// The entry with the highest access count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MostUsedTemplate {
    pub name: String,
    pub access_count: u32,
}

/// Summary of the current user's cache.
///
/// The default value is the empty summary returned on any failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStatsSummary {
    /// Number of cached entries, expired ones included.
    pub total_templates: usize,
    /// Serialized container size in KiB, rounded.
    pub size_kib: u64,
    /// Name of the entry with the oldest write timestamp.
    pub oldest_entry: Option<String>,
    /// Name of the entry with the newest write timestamp.
    pub newest_entry: Option<String>,
    /// Entry with the highest access count.
    pub most_used: Option<MostUsedTemplate>,
}

impl CacheStatsSummary {
    /// Summarize `entries` from a container whose encoded form was
    /// `encoded_len` bytes long.
    pub fn from_entries<T: CacheableTemplate>(
        entries: &IndexMap<String, CacheEntry<T>>,
        encoded_len: usize,
    ) -> Self {
        if entries.is_empty() {
            return Self::default();
        }

        // Ties go to the later entry.
        let oldest = entries
            .values()
            .reduce(|prev, curr| if prev.timestamp < curr.timestamp { prev } else { curr });
        let newest = entries
            .values()
            .reduce(|prev, curr| if prev.timestamp > curr.timestamp { prev } else { curr });
        let most_used = entries.values().reduce(|prev, curr| {
            if prev.access_count > curr.access_count {
                prev
            } else {
                curr
            }
        });

        Self {
            total_templates: entries.len(),
            size_kib: (encoded_len as f64 / 1024.0).round() as u64,
            oldest_entry: oldest.map(|e| e.data.display_name().to_string()),
            newest_entry: newest.map(|e| e.data.display_name().to_string()),
            most_used: most_used.map(|e| MostUsedTemplate {
                name: e.data.display_name().to_string(),
                access_count: e.access_count,
            }),
        }
    }

    /// Human-readable most-used label.
    pub fn most_used_label(&self) -> String {
        match &self.most_used {
            None => "N/A".to_string(),
            Some(m) if m.access_count == 0 => "none used yet".to_string(),
            Some(m) => format!("{} ({} uses)", m.name, m.access_count),
        }
    }

    /// Human-readable size label, e.g. `"3 KB"`.
    pub fn size_label(&self) -> String {
        format!("{} KB", self.size_kib)
    }
}

impl fmt::Display for CacheStatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "templates:   {}", self.total_templates)?;
        writeln!(f, "size:        {}", self.size_label())?;
        writeln!(
            f,
            "oldest:      {}",
            self.oldest_entry.as_deref().unwrap_or("N/A")
        )?;
        writeln!(
            f,
            "newest:      {}",
            self.newest_entry.as_deref().unwrap_or("N/A")
        )?;
        write!(f, "most used:   {}", self.most_used_label())
    }
}

/// Thin statistics accessor over a [`TemplateCacheService`].
///
/// Exposes only the operations a statistics panel needs.
pub struct TemplateCacheStats<'a, S: KeyValueStore + ?Sized, T: CacheableTemplate = Template> {
    service: &'a TemplateCacheService<S, T>,
}

impl<'a, S: KeyValueStore + ?Sized, T: CacheableTemplate> TemplateCacheStats<'a, S, T> {
    pub(crate) fn new(service: &'a TemplateCacheService<S, T>) -> Self {
        Self { service }
    }

    pub fn get_stats(&self) -> CacheStatsSummary {
        self.service.get_cache_stats()
    }

    /// Most-used templates; `None` means the default limit of 5.
    pub fn get_most_used(&self, limit: Option<usize>) -> Vec<T> {
        self.service
            .get_most_used_templates(limit.unwrap_or(DEFAULT_MOST_USED_LIMIT))
    }

    pub fn invalidate(&self) {
        self.service.invalidate()
    }

    pub fn clear(&self) {
        self.service.clear()
    }

    pub fn reset_counters(&self) {
        self.service.reset_access_counters()
    }

    pub fn record_access(&self, template_id: &str) {
        self.service.record_template_access(template_id)
    }
}
