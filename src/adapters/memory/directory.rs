//! In-memory directory tree with the LDAP semantics the engine depends on.
//!
//! DNs are matched case-insensitively. Search filters are not evaluated:
//! the core only issues presence filters, so every object in scope matches.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::ports::directory::{Attributes, Directory, DirectoryEntry, DirectoryError, Scope};

/// A mutating call observed by [`MemoryDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// `add` succeeded for this DN.
    Add(String),
    /// `delete` succeeded for this DN.
    Delete(String),
}

/// Directory tree held in memory.
#[derive(Default)]
pub struct MemoryDirectory {
    objects: Mutex<BTreeMap<String, DirectoryEntry>>,
    mutations: Mutex<Vec<Mutation>>,
}

impl MemoryDirectory {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object without parent checks or mutation logging.
    #[must_use]
    pub fn with_object(self, dn: &str, attrs: &[(&str, &[&str])]) -> Self {
        self.insert(dn, attrs);
        self
    }

    /// Seeds an object without parent checks or mutation logging.
    pub fn insert(&self, dn: &str, attrs: &[(&str, &[&str])]) {
        let attrs = attrs
            .iter()
            .map(|(name, values)| {
                ((*name).to_string(), values.iter().map(|v| (*v).to_string()).collect())
            })
            .collect();
        self.lock_objects().insert(normalize(dn), DirectoryEntry { dn: dn.to_string(), attrs });
    }

    /// Returns the object stored at `dn`.
    #[must_use]
    pub fn get(&self, dn: &str) -> Option<DirectoryEntry> {
        self.lock_objects().get(&normalize(dn)).cloned()
    }

    /// Returns `true` if an object exists at `dn`.
    #[must_use]
    pub fn contains(&self, dn: &str) -> bool {
        self.lock_objects().contains_key(&normalize(dn))
    }

    /// Mutating calls that succeeded, in order.
    #[must_use]
    pub fn mutations(&self) -> Vec<Mutation> {
        self.mutations.lock().expect("mutation log poisoned").clone()
    }

    /// Forgets the recorded mutations.
    pub fn clear_mutations(&self) {
        self.mutations.lock().expect("mutation log poisoned").clear();
    }

    fn lock_objects(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, DirectoryEntry>> {
        self.objects.lock().expect("directory lock poisoned")
    }

    fn record(&self, mutation: Mutation) {
        self.mutations.lock().expect("mutation log poisoned").push(mutation);
    }
}

impl Directory for MemoryDirectory {
    fn search(
        &self,
        base: &str,
        scope: Scope,
        _filter: &str,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let objects = self.lock_objects();
        let base = normalize(base);
        let base_entry = objects.get(&base).ok_or(DirectoryError::NoSuchObject)?;

        let children = objects.iter().filter(|(dn, _)| match scope {
            Scope::Base => false,
            Scope::OneLevel => parent(dn) == Some(base.as_str()),
            Scope::Subtree => dn.len() > base.len() && dn.ends_with(&format!(",{base}")),
        });

        let mut found = Vec::new();
        if scope != Scope::OneLevel {
            found.push(base_entry.clone());
        }
        found.extend(children.map(|(_, entry)| entry.clone()));
        Ok(found)
    }

    fn add(&self, dn: &str, attrs: &Attributes) -> Result<(), DirectoryError> {
        {
            let mut objects = self.lock_objects();
            let key = normalize(dn);
            if objects.contains_key(&key) {
                return Err(DirectoryError::AlreadyExists);
            }
            if let Some(parent) = parent(&key) {
                if !objects.contains_key(parent) {
                    return Err(DirectoryError::NoSuchObject);
                }
            }
            objects.insert(key, DirectoryEntry { dn: dn.to_string(), attrs: attrs.clone() });
        }
        self.record(Mutation::Add(dn.to_string()));
        Ok(())
    }

    fn delete(&self, dn: &str) -> Result<(), DirectoryError> {
        {
            let mut objects = self.lock_objects();
            let key = normalize(dn);
            if !objects.contains_key(&key) {
                return Err(DirectoryError::NoSuchObject);
            }
            if objects.keys().any(|other| parent(other) == Some(key.as_str())) {
                return Err(DirectoryError::Other("operation not allowed on non-leaf".into()));
            }
            objects.remove(&key);
        }
        self.record(Mutation::Delete(dn.to_string()));
        Ok(())
    }
}

fn normalize(dn: &str) -> String {
    dn.to_ascii_lowercase()
}

/// The DN one level up, splitting at the first unescaped comma.
fn parent(dn: &str) -> Option<&str> {
    let mut escaped = false;
    for (i, c) in dn.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => return Some(&dn[i + 1..]),
            _ => escaped = false,
        }
    }
    None
}
