//! Semantic checks run on every parsed map.
//!
//! Hard failures come back as a [`FormatError`]; everything else is a
//! [`Warning`] that is logged while the run carries on.

use std::fmt;

use tracing::warn;

use crate::model::{Entry, FormatError, Map, MapKind, Origin};

/// A suspicious but syncable entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The server name has no domain part.
    UnqualifiedHost {
        /// Map holding the entry.
        map: String,
        /// Entry key.
        key: String,
        /// The server name as written.
        host: String,
    },
    /// The entry carries no mount options.
    NoOptions {
        /// Map holding the entry.
        map: String,
        /// Entry key.
        key: String,
    },
    /// A direct-map key that is not an absolute path.
    RelativeDirectKey {
        /// Map holding the entry.
        map: String,
        /// Entry key.
        key: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnqualifiedHost { map, key, host } => {
                write!(f, "{map}: server `{host}` for `{key}` is not fully qualified")
            }
            Self::NoOptions { map, key } => write!(f, "{map}: no mount options for `{key}`"),
            Self::RelativeDirectKey { map, key } => {
                write!(f, "{map}: direct map key `{key}` does not start with `/`")
            }
        }
    }
}

/// Checks every entry of `map`, returning the warnings it raised.
///
/// Master keys must be absolute paths; that rule only applies to flat
/// files, since the directory stores master keys without their slash in
/// `cn`. Keys of an indirect submap must not start with `/`: their `cn`
/// drops the slash and is read back as the key. Options, when present, must
/// start with `-` on either side.
///
/// # Errors
///
/// Returns a [`FormatError`] for the first entry that breaks a hard rule.
pub fn validate_map(map: &Map, origin: Origin) -> Result<Vec<Warning>, FormatError> {
    let mut warnings = Vec::new();
    for (key, entry) in map.iter() {
        let fail = |reason: &str| FormatError {
            origin,
            map: map.name().to_string(),
            line: entry.to_line(key),
            reason: reason.to_string(),
        };

        if map.kind() == MapKind::Master && origin == Origin::FlatFile && !key.starts_with('/') {
            return Err(fail("mount point must start with `/`"));
        }
        if map.kind() == MapKind::Submap && key.starts_with('/') {
            return Err(fail("indirect map key must not start with `/`"));
        }
        match entry.options() {
            Some(options) if !options.starts_with('-') => {
                return Err(fail("mount options must start with `-`"));
            }
            Some(_) => {}
            None => {
                if let Entry::Submap(_) = entry {
                    warnings.push(Warning::NoOptions {
                        map: map.name().to_string(),
                        key: key.to_string(),
                    });
                }
            }
        }

        if let Entry::Submap(submap) = entry {
            if !submap.host.contains('.') {
                warnings.push(Warning::UnqualifiedHost {
                    map: map.name().to_string(),
                    key: key.to_string(),
                    host: submap.host.clone(),
                });
            }
        }
        if map.kind() == MapKind::Direct && !key.starts_with('/') {
            warnings.push(Warning::RelativeDirectKey {
                map: map.name().to_string(),
                key: key.to_string(),
            });
        }
    }
    Ok(warnings)
}

/// Validates `map` and logs its warnings.
///
/// # Errors
///
/// Returns a [`FormatError`] if a hard rule is broken.
pub fn check(map: &Map, origin: Origin) -> Result<(), FormatError> {
    for warning in validate_map(map, origin)? {
        warn!(%origin, "{warning}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MasterEntry, SubmapEntry};

    fn submap(host: &str, options: Option<&str>) -> Entry {
        Entry::Submap(SubmapEntry {
            host: host.to_string(),
            path: "/export".to_string(),
            options: options.map(String::from),
        })
    }

    #[test]
    fn clean_submap_has_no_warnings() {
        let mut map = Map::new("auto.data", MapKind::Submap);
        map.insert("apps", submap("nfs1.example.org", Some("-rw,hard")));
        assert!(validate_map(&map, Origin::FlatFile).unwrap().is_empty());
    }

    #[test]
    fn short_hosts_and_missing_options_warn() {
        let mut map = Map::new("auto.data", MapKind::Submap);
        map.insert("apps", submap("nfs1", None));
        let warnings = validate_map(&map, Origin::FlatFile).unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings
            .contains(&Warning::NoOptions { map: "auto.data".into(), key: "apps".into() }));
    }

    #[test]
    fn options_without_a_dash_are_fatal() {
        let mut map = Map::new("auto.data", MapKind::Submap);
        map.insert("apps", submap("nfs1.example.org", Some("rw")));
        let err = validate_map(&map, Origin::Directory).unwrap_err();
        assert_eq!(err.origin, Origin::Directory);
        assert!(err.reason.contains("start with `-`"));
    }

    #[test]
    fn relative_master_keys_fail_only_in_flat_files() {
        let mut map = Map::new("auto.master", MapKind::Master);
        map.insert("data", Entry::Master(MasterEntry { map: "auto.data".into(), options: None }));
        assert!(validate_map(&map, Origin::FlatFile).is_err());
        assert!(validate_map(&map, Origin::Directory).is_ok());
    }

    #[test]
    fn slash_keys_are_fatal_in_indirect_maps() {
        let mut map = Map::new("auto.data", MapKind::Submap);
        map.insert("/x", submap("h.example.org", Some("-rw")));
        let err = validate_map(&map, Origin::FlatFile).unwrap_err();
        assert!(err.reason.contains("must not start with `/`"));

        let mut direct = Map::new("auto.direct", MapKind::Direct);
        direct.insert("/x", submap("h.example.org", Some("-rw")));
        assert!(validate_map(&direct, Origin::FlatFile).unwrap().is_empty());
    }

    #[test]
    fn direct_keys_should_be_absolute() {
        let mut map = Map::new("auto.direct", MapKind::Direct);
        map.insert("opt/tools", submap("nfs1.example.org", Some("-ro")));
        let warnings = validate_map(&map, Origin::FlatFile).unwrap();
        assert_eq!(
            warnings,
            vec![Warning::RelativeDirectKey { map: "auto.direct".into(), key: "opt/tools".into() }]
        );
    }
}
