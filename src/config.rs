//! Configuration file loading and resolution.
//!
//! The YAML file names every automount container and flat-file directory the
//! tool may target; `--mode` and `--source` pick one of each. Resolution
//! produces [`Settings`], the read-only record the core runs against.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/amsync/amsync.yaml";

/// Name of the entry selected when no `--mode`/`--source` is given.
pub const DEFAULT_KEY: &str = "default";

/// Parsed configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Name of the master map.
    #[serde(default = "default_master")]
    pub master_map_name: String,
    /// Name of the direct map; `null` disables direct-map handling.
    #[serde(default = "default_direct")]
    pub direct_map_name: Option<String>,
    /// Prefix every submap name must carry to be synced.
    #[serde(default = "default_prefix")]
    pub submap_prefix: String,
    /// Automount container DNs by mode name.
    pub containers: BTreeMap<String, String>,
    /// Flat-file map directories by source name.
    pub map_dirs: BTreeMap<String, PathBuf>,
    /// Seconds to wait after every directory mutation.
    #[serde(default = "default_wait")]
    pub replication_wait_secs: f64,
    /// Object classes for new directory objects.
    #[serde(default)]
    pub object_classes: ObjectClasses,
    /// Directory connection parameters.
    pub ldap: LdapConfig,
    /// Log sink configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Object classes used when creating containers and entries.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectClasses {
    /// Class of a map container.
    #[serde(default = "default_map_class")]
    pub map: String,
    /// Class of a map entry.
    #[serde(default = "default_entry_class")]
    pub entry: String,
}

impl Default for ObjectClasses {
    fn default() -> Self {
        Self { map: default_map_class(), entry: default_entry_class() }
    }
}

/// How to reach the directory server.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LdapConfig {
    /// Server URL, e.g. `ldaps://dc1.example.org`.
    pub url: String,
    /// DN (or UPN) for a simple bind; anonymous when absent.
    #[serde(default)]
    pub bind_dn: Option<String>,
    /// Bind password. `AMSYNC_BIND_PASSWORD` takes precedence.
    #[serde(default)]
    pub bind_password: Option<String>,
    /// Connection timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl LdapConfig {
    /// The bind password, preferring the environment over the file.
    #[must_use]
    pub fn password(&self) -> Option<String> {
        std::env::var("AMSYNC_BIND_PASSWORD").ok().or_else(|| self.bind_password.clone())
    }
}

/// Log sink configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
    /// Optional file receiving a copy of every log line.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_level(), file: None }
    }
}

/// The resolved, read-only record every component is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Name of the master map.
    pub master_map_name: String,
    /// Name of the direct map, if any.
    pub direct_map_name: Option<String>,
    /// Prefix of syncable submap names.
    pub submap_prefix: String,
    /// DN of the automount container holding one container per map.
    pub am_container: String,
    /// Directory holding the flat-file maps.
    pub map_dir: PathBuf,
    /// Pause after each directory mutation.
    pub replication_wait: Duration,
    /// Object class of new map containers.
    pub map_object_class: String,
    /// Object class of new map entries.
    pub entry_object_class: String,
}

impl Settings {
    /// Settings with stock map names and no replication wait, rooted at the
    /// given container and map directory.
    #[must_use]
    pub fn new(am_container: impl Into<String>, map_dir: impl Into<PathBuf>) -> Self {
        Self {
            master_map_name: default_master(),
            direct_map_name: default_direct(),
            submap_prefix: default_prefix(),
            am_container: am_container.into(),
            map_dir: map_dir.into(),
            replication_wait: Duration::ZERO,
            map_object_class: default_map_class(),
            entry_object_class: default_entry_class(),
        }
    }
}

impl Config {
    /// Reads and parses the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_yaml(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Parses configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not a valid configuration.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }

    /// Picks the container and map directory and produces [`Settings`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the requested mode or source has no
    /// entry, or the replication wait is negative.
    pub fn resolve(&self, mode: Option<&str>, source: Option<&str>) -> Result<Settings> {
        let mode = mode.unwrap_or(DEFAULT_KEY);
        let source = source.unwrap_or(DEFAULT_KEY);

        let am_container = self
            .containers
            .get(mode)
            .ok_or_else(|| Error::Config(format!("no container configured for mode `{mode}`")))?;
        let map_dir = self.map_dirs.get(source).ok_or_else(|| {
            Error::Config(format!("no map directory configured for source `{source}`"))
        })?;
        let replication_wait = Duration::try_from_secs_f64(self.replication_wait_secs)
            .map_err(|e| Error::Config(format!("replication_wait_secs: {e}")))?;

        Ok(Settings {
            master_map_name: self.master_map_name.clone(),
            direct_map_name: self.direct_map_name.clone(),
            submap_prefix: self.submap_prefix.clone(),
            am_container: am_container.clone(),
            map_dir: map_dir.clone(),
            replication_wait,
            map_object_class: self.object_classes.map.clone(),
            entry_object_class: self.object_classes.entry.clone(),
        })
    }
}

/// Resolves the configuration file path from the flag, then `AMSYNC_CONFIG`.
#[must_use]
pub fn config_path(flag: Option<&Path>) -> PathBuf {
    match flag {
        Some(path) => path.to_path_buf(),
        None => std::env::var("AMSYNC_CONFIG")
            .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from),
    }
}

fn default_master() -> String {
    "auto.master".to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_direct() -> Option<String> {
    Some("auto.direct".to_string())
}

fn default_prefix() -> String {
    "auto.".to_string()
}

fn default_wait() -> f64 {
    10.0
}

fn default_map_class() -> String {
    "nisMap".to_string()
}

fn default_entry_class() -> String {
    "nisObject".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_level() -> String {
    "info".to_string()
}
