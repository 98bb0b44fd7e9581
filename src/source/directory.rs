//! Directory source: reads and mutates the mirrored maps through `ctx.directory`.
//!
//! Layout under the automount container:
//!
//! ```text
//! cn=<map>,<am_container>                 one container per map
//! cn=<key without slash>,cn=<map>,...     one object per entry
//! ```
//!
//! Every mutation honours the dry-run flag and is followed by the
//! replication settle delay.

use std::collections::BTreeMap;

use ldap3::dn_escape;
use tracing::{debug, info, warn};

use super::order_map_names;
use crate::config::Settings;
use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::model::{parse_map, strip_slash, Entry, FormatError, Map, MapKind, Origin};
use crate::ports::directory::{Attributes, DirectoryEntry, DirectoryError, Scope};
use crate::validate;

/// Substring the directory service inserts into the `cn` of an object that
/// lost a replication collision.
pub const CONFLICT_MARKER: &str = "\nCNF:";

const FILTER_ANY: &str = "(objectClass=*)";
const FILTER_CN: &str = "(cn=*)";

/// A replication-conflict object found while reading a map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// DN exactly as the server reported it.
    pub dn: String,
    /// The mangled `cn` value.
    pub cn: String,
}

/// Raw contents of a directory map, before parsing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Listing {
    /// One `key value` line per ordinary entry.
    pub lines: Vec<String>,
    /// Conflict objects, split out of `lines`.
    pub conflicts: Vec<Conflict>,
    /// DN of the object each key was read from.
    pub dns: BTreeMap<String, String>,
}

/// Reads and writes the directory side of the sync.
pub struct DirectorySource<'a> {
    ctx: &'a ServiceContext,
    dry_run: bool,
}

impl<'a> DirectorySource<'a> {
    /// Creates a source. With `dry_run` set, mutations are logged and skipped.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, dry_run: bool) -> Self {
        Self { ctx, dry_run }
    }

    /// Whether mutations are being skipped.
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// DN of the container for map `name`.
    #[must_use]
    pub fn map_dn(&self, name: &str) -> String {
        map_dn(&self.ctx.settings, name)
    }

    /// DN of the object holding `key` in map `name`.
    #[must_use]
    pub fn entry_dn(&self, name: &str, key: &str) -> String {
        format!("cn={},{}", dn_escape(strip_slash(key)), self.map_dn(name))
    }

    /// Returns `true` if the automount container exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Directory`] for failures other than a missing object.
    pub fn container_exists(&self) -> Result<bool> {
        self.object_exists(&self.ctx.settings.am_container)
    }

    /// Returns `true` if the container for map `name` exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Directory`] for failures other than a missing object.
    pub fn map_exists(&self, name: &str) -> Result<bool> {
        self.object_exists(&self.map_dn(name))
    }

    /// Lists map containers in processing order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContainerMissing`] if the automount container is
    /// gone, or [`Error::MasterMapMissing`] if it holds no master map.
    pub fn list_map_names(&self) -> Result<Vec<String>> {
        order_map_names(self.list_containers()?, &self.ctx.settings, Origin::Directory)
    }

    /// Names of every container directly under the automount container,
    /// unordered and unfiltered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContainerMissing`] if the automount container is gone.
    pub fn list_containers(&self) -> Result<Vec<String>> {
        let base = &self.ctx.settings.am_container;
        let found = match self.ctx.directory.search(base, Scope::OneLevel, FILTER_CN) {
            Ok(found) => found,
            Err(DirectoryError::NoSuchObject) => {
                return Err(Error::ContainerMissing { dn: base.clone() })
            }
            Err(e) => return Err(Error::directory(base.clone(), e)),
        };
        Ok(found.iter().filter_map(|entry| entry.first("cn")).map(String::from).collect())
    }

    /// Reads the objects under map `name` as `key value` lines.
    ///
    /// Returns `None` when the map container does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptEntry`] for an object whose `cn` starts with a
    /// slash, [`Error::Format`] for an object missing a required attribute,
    /// or [`Error::Directory`] if the search fails.
    pub fn read_map(&self, name: &str) -> Result<Option<Listing>> {
        let base = self.map_dn(name);
        let found = match self.ctx.directory.search(&base, Scope::Subtree, FILTER_CN) {
            Ok(found) => found,
            Err(DirectoryError::NoSuchObject) => return Ok(None),
            Err(e) => return Err(Error::directory(base, e)),
        };

        let keeps_slash = MapKind::of(name, &self.ctx.settings).keeps_slash();
        let mut listing = Listing::default();
        for object in found.iter().filter(|object| !same_dn(&object.dn, &base)) {
            let cn = required(object, "cn", name)?;
            if cn.contains(CONFLICT_MARKER) {
                listing.conflicts.push(Conflict { dn: object.dn.clone(), cn: cn.to_string() });
                continue;
            }
            if cn.starts_with('/') {
                return Err(Error::CorruptEntry { map: name.to_string(), dn: object.dn.clone() });
            }
            let key = if keeps_slash { required(object, "nisMapName", name)? } else { cn };
            let value = required(object, "nisMapEntry", name)?;
            listing.lines.push(format!("{key} {value}"));
            listing.dns.insert(key.to_string(), object.dn.clone());
        }
        listing.lines.sort();
        debug!(map = name, entries = listing.lines.len(), "read directory map");
        Ok(Some(listing))
    }

    /// Reads, parses and validates map `name`. Conflict objects are ignored;
    /// every entry remembers the DN it was read from.
    ///
    /// # Errors
    ///
    /// Propagates [`DirectorySource::read_map`] failures and returns
    /// [`Error::Format`] if an entry value is malformed.
    pub fn load_map(&self, name: &str) -> Result<Option<Map>> {
        let Some(listing) = self.read_map(name)? else {
            return Ok(None);
        };
        let kind = MapKind::of(name, &self.ctx.settings);
        let mut map = parse_map(name, kind, &listing.lines, Origin::Directory)?;
        validate::check(&map, Origin::Directory)?;
        for (key, dn) in listing.dns {
            map.set_dn(key, dn);
        }
        Ok(Some(map))
    }

    /// Creates the container for map `name` unless it exists.
    ///
    /// Returns `true` if a container was (or, in a dry run, would be) created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Directory`] if the lookup or the add fails.
    pub fn ensure_container(&self, name: &str) -> Result<bool> {
        if self.map_exists(name)? {
            return Ok(false);
        }
        let dn = self.map_dn(name);
        self.add(&dn, &container_attributes(&self.ctx.settings, name))
    }

    /// Creates the object for `key` in map `name`.
    ///
    /// Returns `true` if the object was (or would be) added. An object
    /// already present at that DN is logged and left alone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Directory`] if the add fails for another reason.
    pub fn create_entry(&self, name: &str, key: &str, entry: &Entry) -> Result<bool> {
        let dn = self.entry_dn(name, key);
        let attrs = entry_attributes(&self.ctx.settings, name, key, entry);
        self.add(&dn, &attrs)
    }

    /// Deletes the object at `dn`, children first when `recursive`.
    ///
    /// A missing object is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Directory`] if a search or delete fails.
    pub fn delete(&self, dn: &str, recursive: bool) -> Result<()> {
        if recursive {
            let children = match self.ctx.directory.search(dn, Scope::OneLevel, FILTER_ANY) {
                Ok(children) => children,
                Err(DirectoryError::NoSuchObject) => {
                    warn!(dn, "cannot delete, object does not exist");
                    return Ok(());
                }
                Err(e) => return Err(Error::directory(dn, e)),
            };
            for child in children {
                self.delete(&child.dn, true)?;
            }
        }
        self.remove(dn)
    }

    /// Deletes the object holding `key` in `mirror`, a map read from the
    /// directory. Keys with no recorded DN fall back to [`Self::entry_dn`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Directory`] if the delete fails.
    pub fn delete_entry(&self, mirror: &Map, key: &str) -> Result<()> {
        let dn = mirror.dn(key).map_or_else(|| self.entry_dn(mirror.name(), key), String::from);
        self.delete(&dn, false)
    }

    /// Deletes a replication-conflict object.
    ///
    /// Conflict objects are removed even in a dry run: they are debris of
    /// the directory's own replication and never hold flat-file data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Directory`] if the delete fails.
    pub fn delete_conflict(&self, conflict: &Conflict) -> Result<()> {
        warn!(dn = %conflict.dn, "deleting replication conflict object");
        match self.ctx.directory.delete(&conflict.dn) {
            Ok(()) | Err(DirectoryError::NoSuchObject) => {}
            Err(e) => return Err(Error::directory(conflict.dn.clone(), e)),
        }
        self.ctx.settle();
        Ok(())
    }

    fn object_exists(&self, dn: &str) -> Result<bool> {
        match self.ctx.directory.search(dn, Scope::Base, FILTER_ANY) {
            Ok(_) => Ok(true),
            Err(DirectoryError::NoSuchObject) => Ok(false),
            Err(e) => Err(Error::directory(dn, e)),
        }
    }

    fn add(&self, dn: &str, attrs: &Attributes) -> Result<bool> {
        if self.dry_run {
            info!(dn, "[dry run] would add");
            return Ok(true);
        }
        match self.ctx.directory.add(dn, attrs) {
            Ok(()) => info!(dn, "added"),
            Err(DirectoryError::AlreadyExists) => {
                warn!(dn, "already exists, leaving it in place");
                return Ok(false);
            }
            Err(e) => return Err(Error::directory(dn, e)),
        }
        self.ctx.settle();
        Ok(true)
    }

    fn remove(&self, dn: &str) -> Result<()> {
        if self.dry_run {
            info!(dn, "[dry run] would delete");
            return Ok(());
        }
        match self.ctx.directory.delete(dn) {
            Ok(()) => info!(dn, "deleted"),
            Err(DirectoryError::NoSuchObject) => {
                warn!(dn, "cannot delete, object does not exist");
                return Ok(());
            }
            Err(e) => return Err(Error::directory(dn, e)),
        }
        self.ctx.settle();
        Ok(())
    }
}

/// DN of the container for map `name`.
#[must_use]
pub fn map_dn(settings: &Settings, name: &str) -> String {
    format!("cn={},{}", dn_escape(name), settings.am_container)
}

/// Attributes of a new map container.
#[must_use]
pub fn container_attributes(settings: &Settings, name: &str) -> Attributes {
    Attributes::from([
        ("objectClass".to_string(), vec!["top".to_string(), settings.map_object_class.clone()]),
        ("cn".to_string(), vec![name.to_string()]),
        ("name".to_string(), vec![name.to_string()]),
        ("nisMapName".to_string(), vec![name.to_string()]),
    ])
}

/// Attributes of a new entry object for `key` in map `name`.
///
/// `cn` and `name` never carry a leading slash; `nisMapName` keeps it for
/// the master and direct maps so the key survives the round trip.
#[must_use]
pub fn entry_attributes(settings: &Settings, name: &str, key: &str, entry: &Entry) -> Attributes {
    let stripped = strip_slash(key).to_string();
    let map_name =
        if MapKind::of(name, settings).keeps_slash() { key.to_string() } else { stripped.clone() };
    Attributes::from([
        ("objectClass".to_string(), vec!["top".to_string(), settings.entry_object_class.clone()]),
        ("cn".to_string(), vec![stripped.clone()]),
        ("name".to_string(), vec![stripped]),
        ("nisMapName".to_string(), vec![map_name]),
        ("nisMapEntry".to_string(), vec![entry.directory_value()]),
    ])
}

fn required<'e>(object: &'e DirectoryEntry, attr: &str, map: &str) -> Result<&'e str> {
    object.first(attr).ok_or_else(|| {
        Error::Format(FormatError {
            origin: Origin::Directory,
            map: map.to_string(),
            line: object.dn.clone(),
            reason: format!("missing {attr} attribute"),
        })
    })
}

/// Compares DNs ignoring case and spacing around separators.
fn same_dn(a: &str, b: &str) -> bool {
    fn canonical(dn: &str) -> String {
        dn.split(',')
            .map(|rdn| rdn.split('=').map(str::trim).collect::<Vec<_>>().join("="))
            .collect::<Vec<_>>()
            .join(",")
            .to_ascii_lowercase()
    }
    canonical(a) == canonical(b)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::adapters::memory::{CountingClock, MemoryDirectory, MemoryFileSystem, Mutation};
    use crate::model::{MasterEntry, SubmapEntry};

    const ROOT: &str = "cn=automounts,dc=example,dc=org";
    const DATA: &str = "cn=auto.data,cn=automounts,dc=example,dc=org";

    fn context(dir: &Arc<MemoryDirectory>, clock: &Arc<CountingClock>) -> ServiceContext {
        ServiceContext::new(
            Settings::new(ROOT, "/maps"),
            Box::new(MemoryFileSystem::new()),
            Box::new(Arc::clone(dir)),
            Box::new(Arc::clone(clock)),
        )
    }

    fn seeded() -> Arc<MemoryDirectory> {
        Arc::new(
            MemoryDirectory::new()
                .with_object(ROOT, &[("cn", &["automounts"])])
                .with_object(DATA, &[("cn", &["auto.data"])])
                .with_object(
                    &format!("cn=apps,{DATA}"),
                    &[
                        ("cn", &["apps"]),
                        ("nisMapName", &["apps"]),
                        ("nisMapEntry", &["-rw nfs1.example.org:/apps"]),
                    ],
                ),
        )
    }

    #[test]
    fn entry_dn_strips_the_leading_slash() {
        let dir = seeded();
        let clock = Arc::new(CountingClock::new());
        let ctx = context(&dir, &clock);
        let source = DirectorySource::new(&ctx, false);
        assert_eq!(
            source.entry_dn("auto.master", "/data"),
            format!("cn=data,cn=auto.master,{ROOT}")
        );
    }

    #[test]
    fn read_map_splits_out_conflicts() {
        let dir = seeded();
        dir.insert(
            &format!("cn=apps\\0ACNF:7f1c,{DATA}"),
            &[("cn", &["apps\nCNF:7f1c"]), ("nisMapEntry", &["nfs9.example.org:/old"])],
        );
        let clock = Arc::new(CountingClock::new());
        let ctx = context(&dir, &clock);

        let listing = DirectorySource::new(&ctx, false).read_map("auto.data").unwrap().unwrap();
        assert_eq!(listing.lines, vec!["apps -rw nfs1.example.org:/apps"]);
        assert_eq!(listing.conflicts.len(), 1);
        assert_eq!(listing.conflicts[0].dn, format!("cn=apps\\0ACNF:7f1c,{DATA}"));
    }

    #[test]
    fn read_map_of_missing_container_is_none() {
        let dir = seeded();
        let clock = Arc::new(CountingClock::new());
        let ctx = context(&dir, &clock);
        assert_eq!(DirectorySource::new(&ctx, false).read_map("auto.home").unwrap(), None);
    }

    #[test]
    fn slash_in_cn_is_corrupt() {
        let dir = seeded();
        dir.insert(
            &format!("cn=/bad,{DATA}"),
            &[("cn", &["/bad"]), ("nisMapEntry", &["nfs1.example.org:/bad"])],
        );
        let clock = Arc::new(CountingClock::new());
        let ctx = context(&dir, &clock);
        let err = DirectorySource::new(&ctx, false).read_map("auto.data").unwrap_err();
        assert!(matches!(err, Error::CorruptEntry { .. }));
    }

    #[test]
    fn master_keys_come_from_nis_map_name() {
        let master = format!("cn=auto.master,{ROOT}");
        let dir = seeded();
        dir.insert(&master, &[("cn", &["auto.master"])]);
        dir.insert(
            &format!("cn=data,{master}"),
            &[("cn", &["data"]), ("nisMapName", &["/data"]), ("nisMapEntry", &["auto.data -rw"])],
        );
        let clock = Arc::new(CountingClock::new());
        let ctx = context(&dir, &clock);

        let map = DirectorySource::new(&ctx, false).load_map("auto.master").unwrap().unwrap();
        assert_eq!(
            map.get("/data"),
            Some(&Entry::Master(MasterEntry {
                map: "auto.data".into(),
                options: Some("-rw".into())
            }))
        );
    }

    #[test]
    fn created_entries_read_back_unchanged() {
        let dir = seeded();
        let clock = Arc::new(CountingClock::new());
        let ctx = context(&dir, &clock);
        let source = DirectorySource::new(&ctx, false);
        let entry = Entry::Submap(SubmapEntry {
            host: "nfs2.example.org".into(),
            path: "/export/data".into(),
            options: None,
        });

        assert!(source.create_entry("auto.data", "data", &entry).unwrap());
        let map = source.load_map("auto.data").unwrap().unwrap();
        assert_eq!(map.get("data"), Some(&entry));
        assert_eq!(map.dn("data"), Some(format!("cn=data,{DATA}").as_str()));
        assert_eq!(clock.sleeps(), 1);
    }

    #[test]
    fn dry_run_leaves_the_directory_alone() {
        let dir = seeded();
        let clock = Arc::new(CountingClock::new());
        let ctx = context(&dir, &clock);
        let source = DirectorySource::new(&ctx, true);

        assert!(source.ensure_container("auto.home").unwrap());
        source.delete(DATA, true).unwrap();
        assert!(dir.mutations().is_empty());
        assert_eq!(clock.sleeps(), 0);
    }

    #[test]
    fn recursive_delete_removes_children_first() {
        let dir = seeded();
        let clock = Arc::new(CountingClock::new());
        let ctx = context(&dir, &clock);

        DirectorySource::new(&ctx, false).delete(DATA, true).unwrap();
        assert_eq!(
            dir.mutations(),
            vec![Mutation::Delete(format!("cn=apps,{DATA}")), Mutation::Delete(DATA.to_string())]
        );
        assert_eq!(clock.sleeps(), 2);
    }

    #[test]
    fn missing_objects_and_duplicates_are_not_errors() {
        let dir = seeded();
        let clock = Arc::new(CountingClock::new());
        let ctx = context(&dir, &clock);
        let source = DirectorySource::new(&ctx, false);

        source.delete(&format!("cn=gone,{DATA}"), false).unwrap();
        let entry = Entry::Submap(SubmapEntry {
            host: "nfs1.example.org".into(),
            path: "/apps".into(),
            options: Some("-rw".into()),
        });
        assert!(!source.create_entry("auto.data", "apps", &entry).unwrap());
        assert!(dir.mutations().is_empty());
    }

    #[test]
    fn attributes_keep_the_slash_only_in_nis_map_name() {
        let settings = Settings::new(ROOT, "/maps");
        let entry = Entry::Master(MasterEntry { map: "auto.data".into(), options: None });
        let attrs = entry_attributes(&settings, "auto.master", "/data", &entry);
        assert_eq!(attrs["cn"], vec!["data"]);
        assert_eq!(attrs["nisMapName"], vec!["/data"]);
        assert_eq!(attrs["nisMapEntry"], vec!["auto.data"]);
        assert_eq!(attrs["objectClass"], vec!["top", "nisObject"]);
    }

    #[test]
    fn entries_are_deleted_at_the_dn_they_were_read_from() {
        let master = format!("cn=auto.master,{ROOT}");
        let dir = seeded();
        dir.insert(&master, &[("cn", &["auto.master"])]);
        dir.insert(
            &format!("cn=datamount,{master}"),
            &[("cn", &["datamount"]), ("nisMapName", &["/data"]), ("nisMapEntry", &["auto.old"])],
        );
        let clock = Arc::new(CountingClock::new());
        let ctx = context(&dir, &clock);
        let source = DirectorySource::new(&ctx, false);

        let map = source.load_map("auto.master").unwrap().unwrap();
        source.delete_entry(&map, "/data").unwrap();
        assert_eq!(dir.mutations(), vec![Mutation::Delete(format!("cn=datamount,{master}"))]);
    }

    #[test]
    fn list_map_names_puts_the_master_first() {
        let dir = seeded();
        dir.insert(&format!("cn=auto.master,{ROOT}"), &[("cn", &["auto.master"])]);
        dir.insert(&format!("cn=auto.apps,{ROOT}"), &[("cn", &["auto.apps"])]);
        dir.insert(&format!("cn=printers,{ROOT}"), &[("cn", &["printers"])]);
        let clock = Arc::new(CountingClock::new());
        let ctx = context(&dir, &clock);

        let names = DirectorySource::new(&ctx, false).list_map_names().unwrap();
        assert_eq!(names, vec!["auto.master", "auto.apps", "auto.data"]);
    }

    #[test]
    fn list_map_names_requires_the_master_container() {
        let dir = seeded();
        let clock = Arc::new(CountingClock::new());
        let ctx = context(&dir, &clock);

        let err = DirectorySource::new(&ctx, false).list_map_names().unwrap_err();
        assert!(
            matches!(&err, Error::MasterMapMissing { origin: Origin::Directory, .. }),
            "unexpected error: {err}"
        );
        assert!(err.to_string().contains("auto.master"));
    }

    #[test]
    fn list_map_names_requires_the_automount_container() {
        let dir = Arc::new(MemoryDirectory::new());
        let clock = Arc::new(CountingClock::new());
        let ctx = context(&dir, &clock);

        let err = DirectorySource::new(&ctx, false).list_map_names().unwrap_err();
        assert!(matches!(err, Error::ContainerMissing { ref dn } if dn == ROOT));
    }

    #[test]
    fn same_dn_ignores_case_and_spacing() {
        assert!(same_dn(
            "CN=auto.data, CN=automounts,DC=example",
            "cn=auto.data,cn=automounts,dc=example"
        ));
        assert!(!same_dn("cn=a,cn=b", "cn=a,cn=c"));
    }
}
