//! Error types for amsync.

use std::path::PathBuf;

use crate::model::{FormatError, Origin};
use crate::ports::directory::DirectoryError;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop a run.
///
/// Validation warnings, `AlreadyExists` on create and replication conflicts
/// are not errors: they are logged and the run carries on.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The automount container is missing from the directory.
    #[error("automount container {dn} does not exist in the directory")]
    ContainerMissing {
        /// DN of the missing container.
        dn: String,
    },

    /// The flat-file map directory is missing.
    #[error("flat file map directory {} does not exist", path.display())]
    MapDirMissing {
        /// Configured map directory.
        path: PathBuf,
    },

    /// The master map is missing from one of the sources.
    #[error("master map {name} does not exist in the {origin} source")]
    MasterMapMissing {
        /// Configured master map name.
        name: String,
        /// Source lacking the master map.
        origin: Origin,
    },

    /// A directory object the tool could never have written.
    #[error("directory entry {dn} in {map} has a leading slash in its cn")]
    CorruptEntry {
        /// Map holding the object.
        map: String,
        /// DN of the object.
        dn: String,
    },

    /// A map was requested that has no flat file.
    #[error("no flat file map named {name}")]
    UnknownMap {
        /// Requested map name.
        name: String,
    },

    /// A malformed line in either source.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A directory call failed in a way the engine does not absorb.
    #[error("directory operation on {dn} failed: {source}")]
    Directory {
        /// DN the operation targeted.
        dn: String,
        /// Underlying failure.
        #[source]
        source: DirectoryError,
    },

    /// Reading the flat-file source failed.
    #[error("failed to read {}: {message}", path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying failure.
        message: String,
    },

    /// The configuration file is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// Command-line arguments could not be parsed.
    #[error(transparent)]
    Usage(#[from] clap::Error),
}

impl Error {
    /// Wraps a directory failure with the DN it concerned.
    pub fn directory(dn: impl Into<String>, source: DirectoryError) -> Self {
        Self::Directory { dn: dn.into(), source }
    }

    /// Process exit status for this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => 2,
            Self::ContainerMissing { .. }
            | Self::MapDirMissing { .. }
            | Self::MasterMapMissing { .. }
            | Self::UnknownMap { .. } => 3,
            Self::Format(_) | Self::CorruptEntry { .. } => 4,
            Self::Directory { .. } | Self::Io { .. } => 5,
            Self::Config(_) => 6,
        }
    }
}
