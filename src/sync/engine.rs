//! The reconciliation engine.
//!
//! A run is strictly sequential:
//!
//! 1. preflight: the automount container, the map directory and the master
//!    map file must exist; orphans are reported but do not stop the run;
//! 2. parent pass: every flat-file map gets a container, containers with no
//!    flat file are removed with their entries;
//! 3. content pass per selected map: clean conflicts, delete extra keys,
//!    create missing keys, re-read, replace drifted keys, clean conflicts
//!    again. If either scan found conflicts the pass runs once more.

use tracing::{info, warn};

use super::{ConflictDetector, Delta, SyncAction, SyncReport};
use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::model::{Map, Origin};
use crate::source::{is_map_name, DirectorySource, FlatFileSource, Orphans};

/// Drives one sync run over a [`ServiceContext`].
pub struct Reconciler<'a> {
    ctx: &'a ServiceContext,
    flat: FlatFileSource<'a>,
    directory: DirectorySource<'a>,
}

impl<'a> Reconciler<'a> {
    /// Creates an engine. With `dry_run` set, nothing but conflict objects
    /// is written.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, dry_run: bool) -> Self {
        Self {
            ctx,
            flat: FlatFileSource::new(ctx),
            directory: DirectorySource::new(ctx, dry_run),
        }
    }

    /// Runs every pass. An empty `selection` syncs the content of all maps;
    /// otherwise only the named maps' contents are synced.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: a failed precondition, a malformed map,
    /// a selected map with no flat file, or a directory failure.
    pub fn run(&self, selection: &[String]) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        self.preflight()?;
        self.sync_parents(&mut report)?;

        let all = self.flat.list_map_names()?;
        let names = if selection.is_empty() {
            all
        } else {
            if let Some(unknown) = selection.iter().find(|name| !all.contains(*name)) {
                return Err(Error::UnknownMap { name: unknown.clone() });
            }
            selection.to_vec()
        };

        for name in &names {
            self.sync_map(name, &mut report)?;
        }
        info!(actions = report.actions.len(), maps = names.len(), "sync finished");
        Ok(report)
    }

    /// Checks the fatal preconditions and reports orphaned maps.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContainerMissing`], [`Error::MapDirMissing`] or
    /// [`Error::MasterMapMissing`] when the matching precondition fails.
    pub fn preflight(&self) -> Result<Orphans> {
        let settings = &self.ctx.settings;
        if !self.directory.container_exists()? {
            return Err(Error::ContainerMissing { dn: settings.am_container.clone() });
        }
        if !self.flat.dir_exists() {
            return Err(Error::MapDirMissing { path: settings.map_dir.clone() });
        }
        if !self.flat.map_exists(&settings.master_map_name) {
            return Err(Error::MasterMapMissing {
                name: settings.master_map_name.clone(),
                origin: Origin::FlatFile,
            });
        }

        let orphans = self.flat.detect_orphans()?;
        for name in &orphans.unused {
            warn!(map = %name, "flat file map is not referenced from the master map");
        }
        for name in &orphans.missing {
            warn!(map = %name, "master map references a map with no flat file");
        }
        Ok(orphans)
    }

    /// Makes the set of map containers match the set of flat files.
    ///
    /// # Errors
    ///
    /// Propagates listing and directory failures.
    pub fn sync_parents(&self, report: &mut SyncReport) -> Result<()> {
        let flat_names = self.flat.list_map_names()?;
        for name in &flat_names {
            if self.directory.ensure_container(name)? {
                report.push(SyncAction::CreateContainer { map: name.clone() });
            }
        }

        let stale: Vec<String> = self
            .directory_map_names()?
            .into_iter()
            .filter(|name| !flat_names.contains(name))
            .collect();
        for name in stale {
            info!(map = %name, "map has no flat file, removing it from the directory");
            self.directory.delete(&self.directory.map_dn(&name), true)?;
            report.push(SyncAction::DeleteContainer { map: name });
        }
        Ok(())
    }

    /// Map containers in the directory, ordered like the flat-file maps.
    ///
    /// A dry run never creates the master container, so on a fresh directory
    /// it falls back to the unordered container list.
    fn directory_map_names(&self) -> Result<Vec<String>> {
        match self.directory.list_map_names() {
            Err(Error::MasterMapMissing { origin: Origin::Directory, .. })
                if self.directory.dry_run() =>
            {
                let mut names: Vec<String> = self
                    .directory
                    .list_containers()?
                    .into_iter()
                    .filter(|name| is_map_name(name, &self.ctx.settings))
                    .collect();
                names.sort();
                Ok(names)
            }
            other => other,
        }
    }

    /// Syncs the entries of map `name`, retrying once after conflicts.
    ///
    /// # Errors
    ///
    /// Propagates failures of either content pass.
    pub fn sync_map(&self, name: &str, report: &mut SyncReport) -> Result<()> {
        if self.content_pass(name, report)? {
            warn!(map = name, "replication conflicts found, syncing the map once more");
            report.retried.push(name.to_string());
            self.content_pass(name, report)?;
        }
        Ok(())
    }

    /// One content pass over map `name`. Returns `true` if either conflict
    /// scan found something.
    fn content_pass(&self, name: &str, report: &mut SyncReport) -> Result<bool> {
        let conflicts = ConflictDetector::new(&self.directory);
        let mut conflicted = conflicts.scan_and_clean(name, report)?;

        let flat = self.flat.load_map(name)?;
        match self.directory.load_map(name)? {
            Some(mirror) => self.apply_delta(&flat, &mirror, report)?,
            None => info!(map = name, "map container does not exist yet, skipping its entries"),
        }

        conflicted |= conflicts.scan_and_clean(name, report)?;
        Ok(conflicted)
    }

    fn apply_delta(&self, flat: &Map, mirror: &Map, report: &mut SyncReport) -> Result<()> {
        let name = flat.name();
        let delta = Delta::between(flat, mirror);

        for key in delta.extra {
            self.directory.delete_entry(mirror, &key)?;
            report.push(SyncAction::Delete { map: name.to_string(), key });
        }
        for key in delta.missing {
            if let Some(entry) = flat.get(&key) {
                if self.directory.create_entry(name, &key, entry)? {
                    report.push(SyncAction::Create { map: name.to_string(), key });
                }
            }
        }

        let Some(mirror) = self.directory.load_map(name)? else {
            return Ok(());
        };
        for key in Delta::between(flat, &mirror).drifted {
            if let Some(entry) = flat.get(&key) {
                info!(map = name, key = %key, "entry differs from the flat file, replacing it");
                self.directory.delete_entry(&mirror, &key)?;
                if self.directory.create_entry(name, &key, entry)? {
                    report.push(SyncAction::Replace { map: name.to_string(), key });
                }
            }
        }
        Ok(())
    }
}
