//! Flat-file source: the authoritative map directory. Never written.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::debug;

use super::order_map_names;
use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::model::{parse_map, Map, MapKind, Origin};
use crate::validate;

/// Maps on disk that the master map does not account for, and the reverse.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Orphans {
    /// Flat-file submaps no master entry references.
    pub unused: Vec<String>,
    /// Maps referenced from the master map with no flat file.
    pub missing: Vec<String>,
}

impl Orphans {
    /// Returns `true` if nothing is out of place.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unused.is_empty() && self.missing.is_empty()
    }
}

/// Reads maps from the configured map directory through `ctx.fs`.
pub struct FlatFileSource<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> FlatFileSource<'a> {
    /// Creates a source reading from `ctx.settings.map_dir`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Returns `true` if the map directory exists.
    #[must_use]
    pub fn dir_exists(&self) -> bool {
        self.ctx.fs.exists(&self.ctx.settings.map_dir)
    }

    /// Returns `true` if a file exists for `name`.
    #[must_use]
    pub fn map_exists(&self, name: &str) -> bool {
        self.ctx.fs.exists(&self.path(name))
    }

    /// Lists map names on disk in processing order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MasterMapMissing`] if there is no master map file,
    /// or [`Error::Io`] if the directory cannot be listed.
    pub fn list_map_names(&self) -> Result<Vec<String>> {
        let dir = &self.ctx.settings.map_dir;
        let names = self
            .ctx
            .fs
            .list_dir(dir)
            .map_err(|e| Error::Io { path: dir.clone(), message: e.to_string() })?;
        order_map_names(names, &self.ctx.settings, Origin::FlatFile)
    }

    /// Reads a map file, dropping blank and comment lines.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read.
    pub fn read_map(&self, name: &str) -> Result<Vec<String>> {
        let path = self.path(name);
        debug!(path = %path.display(), "reading flat file map");
        let contents = self
            .ctx
            .fs
            .read_to_string(&path)
            .map_err(|e| Error::Io { path: path.clone(), message: e.to_string() })?;
        Ok(contents
            .lines()
            .filter(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('#')
            })
            .map(|line| line.trim_end().to_string())
            .collect())
    }

    /// Reads, parses and validates a map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or [`Error::Format`]
    /// if a line is malformed.
    pub fn load_map(&self, name: &str) -> Result<Map> {
        let lines = self.read_map(name)?;
        let map = parse_map(name, MapKind::of(name, &self.ctx.settings), &lines, Origin::FlatFile)?;
        validate::check(&map, Origin::FlatFile)?;
        Ok(map)
    }

    /// Compares the master map's references with the files on disk.
    ///
    /// # Errors
    ///
    /// Propagates failures listing the directory or loading the master map.
    pub fn detect_orphans(&self) -> Result<Orphans> {
        let settings = &self.ctx.settings;
        let master = self.load_map(&settings.master_map_name)?;
        let referenced: BTreeSet<&str> = master.referenced_maps().collect();
        let on_disk = self.list_map_names()?;

        let unused = on_disk
            .iter()
            .filter(|name| **name != settings.master_map_name)
            .filter(|name| !referenced.contains(name.as_str()))
            .cloned()
            .collect();
        let missing = referenced
            .iter()
            .filter(|name| !self.map_exists(name))
            .map(|name| (*name).to_string())
            .collect();

        Ok(Orphans { unused, missing })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.ctx.settings.map_dir.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{CountingClock, MemoryDirectory, MemoryFileSystem};
    use crate::config::Settings;

    fn context(fs: MemoryFileSystem) -> ServiceContext {
        ServiceContext::new(
            Settings::new("cn=automounts,dc=example,dc=org", "/maps"),
            Box::new(fs),
            Box::new(MemoryDirectory::new()),
            Box::new(CountingClock::new()),
        )
    }

    #[test]
    fn read_map_drops_comments_and_blank_lines() {
        let ctx = context(MemoryFileSystem::new().with_file(
            "/maps/auto.data",
            "# shared data\n\napps -rw nfs1.example.org:/apps\n   \n#old nfs0:/x\ndata nfs2.example.org:/data\n",
        ));
        let lines = FlatFileSource::new(&ctx).read_map("auto.data").unwrap();
        assert_eq!(lines, vec!["apps -rw nfs1.example.org:/apps", "data nfs2.example.org:/data"]);
    }

    #[test]
    fn load_map_rejects_bad_master_lines() {
        let ctx = context(
            MemoryFileSystem::new().with_file("/maps/auto.master", "/data auto.data -rw extra\n"),
        );
        let err = FlatFileSource::new(&ctx).load_map("auto.master").unwrap_err();
        assert!(matches!(err, Error::Format(e) if e.line == "/data auto.data -rw extra"));
    }

    #[test]
    fn orphans_in_both_directions() {
        let ctx = context(
            MemoryFileSystem::new()
                .with_file("/maps/auto.master", "/data auto.data -rw\n/home auto.home\n")
                .with_file("/maps/auto.data", "apps nfs1.example.org:/apps\n")
                .with_file("/maps/auto.scratch", "tmp nfs1.example.org:/tmp\n"),
        );
        let orphans = FlatFileSource::new(&ctx).detect_orphans().unwrap();
        assert_eq!(orphans.unused, vec!["auto.scratch"]);
        assert_eq!(orphans.missing, vec!["auto.home"]);
    }

    #[test]
    fn missing_master_file_is_fatal() {
        let ctx = context(MemoryFileSystem::new().with_file("/maps/auto.data", ""));
        let err = FlatFileSource::new(&ctx).list_map_names().unwrap_err();
        assert!(matches!(err, Error::MasterMapMissing { origin: Origin::FlatFile, .. }));
    }
}
