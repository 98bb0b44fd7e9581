//! Directory-service port: the three LDAP primitives the core relies on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Attribute name to values, as sent with an add request.
pub type Attributes = BTreeMap<String, Vec<String>>;

/// Search scope relative to the base DN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The base object only.
    Base,
    /// Immediate children of the base, excluding the base.
    OneLevel,
    /// The base and everything below it.
    Subtree,
}

/// One object returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Distinguished name as reported by the server.
    pub dn: String,
    /// Attribute values keyed by attribute name.
    pub attrs: Attributes,
}

impl DirectoryEntry {
    /// First value of `attr`, matching the attribute name case-insensitively.
    #[must_use]
    pub fn first(&self, attr: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(attr))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}

/// Failure of a directory call.
///
/// `NoSuchObject` and `AlreadyExists` are distinguished because the engine
/// treats them as states rather than failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum DirectoryError {
    /// The named object does not exist.
    #[error("no such object")]
    NoSuchObject,
    /// An object with that DN already exists.
    #[error("already exists")]
    AlreadyExists,
    /// Anything else the server or transport reported.
    #[error("{0}")]
    Other(String),
}

/// An already-connected directory client.
pub trait Directory: Send + Sync {
    /// Searches below `base` with an LDAP filter.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NoSuchObject`] if `base` does not exist.
    fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &str,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    /// Creates an object.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::AlreadyExists`] if `dn` is taken, or
    /// [`DirectoryError::NoSuchObject`] if its parent is missing.
    fn add(&self, dn: &str, attrs: &Attributes) -> Result<(), DirectoryError>;

    /// Deletes a leaf object.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NoSuchObject`] if `dn` does not exist.
    fn delete(&self, dn: &str) -> Result<(), DirectoryError>;
}

impl<T: Directory + ?Sized> Directory for std::sync::Arc<T> {
    fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &str,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        (**self).search(base, scope, filter)
    }

    fn add(&self, dn: &str, attrs: &Attributes) -> Result<(), DirectoryError> {
        (**self).add(dn, attrs)
    }

    fn delete(&self, dn: &str) -> Result<(), DirectoryError> {
        (**self).delete(dn)
    }
}
