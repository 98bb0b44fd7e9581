//! Normalized automount map model shared by both sources.
//!
//! A [`Map`] is what the flat files and the directory are both reduced to
//! before the reconciliation engine compares them. Entries are tagged by map
//! kind: the master map holds [`MasterEntry`] values, every other map holds
//! [`SubmapEntry`] values.

pub mod parse;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Settings;

pub use parse::{
    parse_map, parse_master, parse_master_line, parse_submap, parse_submap_line, FormatError,
};

/// Which side of the sync a map was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// The authoritative flat-file map directory.
    FlatFile,
    /// The directory-service mirror.
    Directory,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FlatFile => f.write_str("flat file"),
            Self::Directory => f.write_str("directory"),
        }
    }
}

/// The role a map name plays in the automount hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    /// The top-level table of mount points.
    Master,
    /// The reserved submap whose keys are absolute paths.
    Direct,
    /// Any other submap.
    Submap,
}

impl MapKind {
    /// Classifies a map name using the configured master and direct names.
    #[must_use]
    pub fn of(name: &str, settings: &Settings) -> Self {
        if name == settings.master_map_name {
            Self::Master
        } else if settings.direct_map_name.as_deref() == Some(name) {
            Self::Direct
        } else {
            Self::Submap
        }
    }

    /// Whether directory entries of this kind keep the leading slash of
    /// their key in `nisMapName`.
    #[must_use]
    pub fn keeps_slash(self) -> bool {
        matches!(self, Self::Master | Self::Direct)
    }
}

/// One line of the master map: a mount point pointing at a submap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterEntry {
    /// The submap mounted at this point.
    pub map: String,
    /// Mount options, `None` when the line carries none.
    pub options: Option<String>,
}

/// One line of a submap: a key pointing at an NFS export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmapEntry {
    /// NFS server hostname.
    pub host: String,
    /// Exported directory on the server.
    pub path: String,
    /// Mount options, `None` when the line carries none.
    pub options: Option<String>,
}

/// A map entry, tagged by the kind of map it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entry {
    /// Entry of the master map.
    Master(MasterEntry),
    /// Entry of the direct map or any other submap.
    Submap(SubmapEntry),
}

impl Entry {
    /// Mount options, if any.
    #[must_use]
    pub fn options(&self) -> Option<&str> {
        match self {
            Self::Master(e) => e.options.as_deref(),
            Self::Submap(e) => e.options.as_deref(),
        }
    }

    /// The `nisMapEntry` value stored in the directory for this entry.
    ///
    /// Absent options become the empty string here and disappear after
    /// trimming, so re-parsing yields `None` again.
    #[must_use]
    pub fn directory_value(&self) -> String {
        let options = self.options().unwrap_or("");
        let value = match self {
            Self::Master(e) => format!("{} {options}", e.map),
            Self::Submap(e) => format!("{options} {}:{}", e.host, e.path),
        };
        value.trim().to_string()
    }

    /// Renders the entry as a flat-file line for `key`.
    #[must_use]
    pub fn to_line(&self, key: &str) -> String {
        match self {
            Self::Master(e) => match &e.options {
                Some(options) => format!("{key}\t\t{}\t{options}", e.map),
                None => format!("{key}\t\t{}", e.map),
            },
            Self::Submap(e) => match &e.options {
                Some(options) => format!("{key}\t\t{options} {}:{}", e.host, e.path),
                None => format!("{key}\t\t{}:{}", e.host, e.path),
            },
        }
    }
}

/// A normalized automount map.
///
/// Keys are compared exactly; insertion order carries no meaning. Maps read
/// from the directory also remember the DN each key was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Map {
    name: String,
    kind: MapKind,
    entries: BTreeMap<String, Entry>,
    dns: BTreeMap<String, String>,
}

impl Map {
    /// Creates an empty map.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: MapKind) -> Self {
        Self { name: name.into(), kind, entries: BTreeMap::new(), dns: BTreeMap::new() }
    }

    /// The map name this map was parsed under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of this map.
    #[must_use]
    pub fn kind(&self) -> MapKind {
        self.kind
    }

    /// Looks up an entry by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Returns `true` if the map holds `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates over keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Inserts an entry, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, entry: Entry) -> Option<Entry> {
        self.entries.insert(key.into(), entry)
    }

    /// DN of the directory object `key` was read from.
    #[must_use]
    pub fn dn(&self, key: &str) -> Option<&str> {
        self.dns.get(key).map(String::as_str)
    }

    /// Records the DN of the directory object holding `key`.
    pub fn set_dn(&mut self, key: impl Into<String>, dn: impl Into<String>) {
        self.dns.insert(key.into(), dn.into());
    }

    /// Names of the submaps referenced by master map entries.
    pub fn referenced_maps(&self) -> impl Iterator<Item = &str> {
        self.entries.values().filter_map(|entry| match entry {
            Entry::Master(e) => Some(e.map.as_str()),
            Entry::Submap(_) => None,
        })
    }

    /// Renders the map as flat-file lines, sorted by key.
    #[must_use]
    pub fn to_lines(&self) -> Vec<String> {
        self.iter().map(|(key, entry)| entry.to_line(key)).collect()
    }
}

/// Strips one leading slash, as required when a key becomes a `cn`.
#[must_use]
pub fn strip_slash(key: &str) -> &str {
    key.strip_prefix('/').unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submap(host: &str, path: &str, options: Option<&str>) -> Entry {
        Entry::Submap(SubmapEntry {
            host: host.to_string(),
            path: path.to_string(),
            options: options.map(String::from),
        })
    }

    #[test]
    fn directory_value_puts_options_first_for_submaps() {
        let entry = submap("nfs1.example.org", "/export/apps", Some("-rw,intr"));
        assert_eq!(entry.directory_value(), "-rw,intr nfs1.example.org:/export/apps");
    }

    #[test]
    fn directory_value_drops_absent_options() {
        let entry = submap("nfs1.example.org", "/export/apps", None);
        assert_eq!(entry.directory_value(), "nfs1.example.org:/export/apps");

        let master = Entry::Master(MasterEntry { map: "auto.home".into(), options: None });
        assert_eq!(master.directory_value(), "auto.home");
    }

    #[test]
    fn absent_and_empty_options_are_not_equal() {
        assert_ne!(submap("h.example.org", "/p", None), submap("h.example.org", "/p", Some("")));
    }

    #[test]
    fn to_lines_is_sorted_by_key() {
        let mut map = Map::new("auto.data", MapKind::Submap);
        map.insert("zeta", submap("b.example.org", "/z", None));
        map.insert("alpha", submap("a.example.org", "/a", Some("-ro")));
        assert_eq!(
            map.to_lines(),
            vec![
                "alpha\t\t-ro a.example.org:/a".to_string(),
                "zeta\t\tb.example.org:/z".to_string()
            ]
        );
    }

    #[test]
    fn strip_slash_removes_only_one_leading_slash() {
        assert_eq!(strip_slash("/data/apps"), "data/apps");
        assert_eq!(strip_slash("apps"), "apps");
        assert_eq!(strip_slash("//x"), "/x");
    }
}
