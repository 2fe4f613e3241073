//! Per-user storage keys.
//!
//! Each signed-in user gets their own container and usage keys,
//! `<base>_<userId>`. Before anyone signs in the bare base key is used.
//! Every namespaced key of a base shares the `<base>_` prefix, which is what
//! the cleanup sweep scans.

use std::fmt;

/// Separator between the base key and the user id.
const SEPARATOR: char = '_';

/// A storage key scoped to one user (or to nobody).
///
/// Fields are private; keys are only built through [`UserScopedKey::unscoped`]
/// and [`UserScopedKey::for_user`], so the rendered key always matches the
/// parts it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserScopedKey {
    base: String,
    user_id: Option<String>,
    rendered: String,
}

impl UserScopedKey {
    /// The bare base key, used before a user is set.
    pub fn unscoped(base: &str) -> Self {
        Self {
            base: base.to_string(),
            user_id: None,
            rendered: base.to_string(),
        }
    }

    /// The key of `base` for `user_id`.
    pub fn for_user(base: &str, user_id: &str) -> Self {
        Self {
            base: base.to_string(),
            user_id: Some(user_id.to_string()),
            rendered: format!("{base}{SEPARATOR}{user_id}"),
        }
    }

    /// The base key this key was derived from.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The user this key is scoped to, if any.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// The storage key.
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// Prefix shared by every user-scoped key of `base`.
    pub fn namespace_prefix(base: &str) -> String {
        format!("{base}{SEPARATOR}")
    }

    /// Recover a user-scoped key from a raw storage key.
    ///
    /// Returns `None` if `key` does not carry the `<base>_` prefix or the
    /// user part is empty.
    pub fn parse(base: &str, key: &str) -> Option<Self> {
        let user_id = key.strip_prefix(&Self::namespace_prefix(base))?;
        if user_id.is_empty() {
            return None;
        }
        Some(Self::for_user(base, user_id))
    }
}

impl fmt::Display for UserScopedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}
