//! In-memory filesystem for exercising the flat-file source without disk.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::ports::filesystem::FileSystem;

/// Files and directories held in memory.
#[derive(Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, String>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
}

impl MemoryFileSystem {
    /// Creates an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, implicitly creating its parent directory.
    #[must_use]
    pub fn with_file(self, path: impl Into<PathBuf>, contents: &str) -> Self {
        self.write(path, contents);
        self
    }

    /// Adds an empty directory.
    #[must_use]
    pub fn with_dir(self, path: impl Into<PathBuf>) -> Self {
        self.dirs.lock().expect("fs lock poisoned").insert(path.into());
        self
    }

    /// Creates or replaces a file.
    pub fn write(&self, path: impl Into<PathBuf>, contents: &str) {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.dirs.lock().expect("fs lock poisoned").insert(parent.to_path_buf());
        }
        self.files.lock().expect("fs lock poisoned").insert(path, contents.to_string());
    }

    /// Removes a file if present.
    pub fn remove(&self, path: &Path) {
        self.files.lock().expect("fs lock poisoned").remove(path);
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let files = self.files.lock().expect("fs lock poisoned");
        files.get(path).cloned().ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().expect("fs lock poisoned").contains_key(path)
            || self.dirs.lock().expect("fs lock poisoned").contains(path)
    }

    fn list_dir(
        &self,
        path: &Path,
    ) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
        if !self.dirs.lock().expect("fs lock poisoned").contains(path) {
            return Err(format!("Not a directory: {}", path.display()).into());
        }
        let files = self.files.lock().expect("fs lock poisoned");
        Ok(files
            .keys()
            .filter(|k| k.parent() == Some(path))
            .filter_map(|k| k.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_direct_children() {
        let fs = MemoryFileSystem::new()
            .with_file("/maps/auto.master", "/data auto.data\n")
            .with_file("/maps/auto.data", "")
            .with_file("/maps/old/auto.gone", "");
        assert_eq!(fs.list_dir(Path::new("/maps")).unwrap(), vec!["auto.data", "auto.master"]);
        assert!(fs.exists(Path::new("/maps")));
    }

    #[test]
    fn empty_directories_exist() {
        let fs = MemoryFileSystem::new().with_dir("/maps");
        assert!(fs.exists(Path::new("/maps")));
        assert!(fs.list_dir(Path::new("/maps")).unwrap().is_empty());
        assert!(fs.list_dir(Path::new("/elsewhere")).is_err());
    }
}
