//! Clinical note templates and the cacheable-template marker trait.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Minimum template name length, in characters, after trimming.
pub const MIN_TEMPLATE_NAME_LENGTH: usize = 1;
/// Maximum template name length, in characters.
pub const MAX_TEMPLATE_NAME_LENGTH: usize = 100;
/// Maximum template body length, in characters.
pub const MAX_TEMPLATE_CONTENT_LENGTH: usize = 50_000;

/// Marker trait for payloads the template cache can hold.
///
/// The cache treats the payload as opaque apart from these three accessors:
/// the id keys the entry, the name shows up in statistics, and the creation
/// time orders read results.
pub trait CacheableTemplate: Clone + Serialize + DeserializeOwned {
    /// Opaque backend identifier of this template.
    fn template_id(&self) -> &str;

    /// Human-readable name used in statistics output.
    fn display_name(&self) -> &str;

    /// When the template was created in the backend.
    fn created_at(&self) -> DateTime<Utc>;
}

/// A user-owned clinical note template, as stored by the persistence backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
}

impl Template {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content: content.into(),
            created_at,
            user_id: user_id.into(),
        }
    }

    /// Check name and content against the template limits.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name_len = self.name.trim().chars().count();
        if name_len < MIN_TEMPLATE_NAME_LENGTH {
            return Err(ValidationError::RequiredFieldMissing {
                field: "name".to_string(),
            });
        }
        if name_len > MAX_TEMPLATE_NAME_LENGTH {
            return Err(ValidationError::TooLong {
                field: "name".to_string(),
                max: MAX_TEMPLATE_NAME_LENGTH,
                actual: name_len,
            });
        }

        let content_len = self.content.chars().count();
        if content_len > MAX_TEMPLATE_CONTENT_LENGTH {
            return Err(ValidationError::TooLong {
                field: "content".to_string(),
                max: MAX_TEMPLATE_CONTENT_LENGTH,
                actual: content_len,
            });
        }

        Ok(())
    }
}

impl CacheableTemplate for Template {
    fn template_id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
