//! Key-level differences between the flat-file and directory copies of a map.

use crate::model::Map;

/// What separates a directory map from its flat-file original.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Delta {
    /// Keys only the directory has.
    pub extra: Vec<String>,
    /// Keys only the flat file has.
    pub missing: Vec<String>,
    /// Keys both have, with differing entries.
    pub drifted: Vec<String>,
}

impl Delta {
    /// Compares `flat` (authoritative) against `directory`.
    ///
    /// Keys are compared exactly. All three lists come out in ascending order.
    #[must_use]
    pub fn between(flat: &Map, directory: &Map) -> Self {
        let extra =
            directory.keys().filter(|k| !flat.contains_key(k)).map(String::from).collect();
        let missing =
            flat.keys().filter(|k| !directory.contains_key(k)).map(String::from).collect();
        let drifted = flat
            .iter()
            .filter(|(key, entry)| directory.get(key).is_some_and(|other| other != *entry))
            .map(|(key, _)| key.to_string())
            .collect();
        Self { extra, missing, drifted }
    }

    /// Returns `true` if the maps already agree.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extra.is_empty() && self.missing.is_empty() && self.drifted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entry, MapKind, SubmapEntry};

    fn entry(host: &str, options: Option<&str>) -> Entry {
        Entry::Submap(SubmapEntry {
            host: host.to_string(),
            path: "/export".to_string(),
            options: options.map(String::from),
        })
    }

    #[test]
    fn extra_missing_and_equal_keys() {
        let mut flat = Map::new("auto.data", MapKind::Submap);
        flat.insert("a", entry("x.example.org", None));
        flat.insert("b", entry("y.example.org", None));
        let mut directory = Map::new("auto.data", MapKind::Submap);
        directory.insert("b", entry("y.example.org", None));
        directory.insert("c", entry("z.example.org", None));

        let delta = Delta::between(&flat, &directory);
        assert_eq!(delta.extra, vec!["c"]);
        assert_eq!(delta.missing, vec!["a"]);
        assert!(delta.drifted.is_empty());
    }

    #[test]
    fn option_changes_are_drift() {
        let mut flat = Map::new("auto.data", MapKind::Submap);
        flat.insert("a", entry("x.example.org", Some("-rw")));
        let mut directory = Map::new("auto.data", MapKind::Submap);
        directory.insert("a", entry("x.example.org", Some("-ro")));

        assert_eq!(Delta::between(&flat, &directory).drifted, vec!["a"]);
    }

    #[test]
    fn keys_differing_only_in_case_are_distinct() {
        let mut flat = Map::new("auto.data", MapKind::Submap);
        flat.insert("Apps", entry("x.example.org", None));
        let mut directory = Map::new("auto.data", MapKind::Submap);
        directory.insert("apps", entry("x.example.org", None));

        let delta = Delta::between(&flat, &directory);
        assert_eq!(delta.extra, vec!["apps"]);
        assert_eq!(delta.missing, vec!["Apps"]);
    }

    #[test]
    fn identical_maps_have_an_empty_delta() {
        let mut flat = Map::new("auto.data", MapKind::Submap);
        flat.insert("a", entry("x.example.org", Some("-rw")));
        assert!(Delta::between(&flat, &flat.clone()).is_empty());
    }
}
