//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `amsync`.
#[derive(Debug, Parser)]
#[command(
    name = "amsync",
    version,
    about = "Mirror automount flat-file maps into a directory service"
)]
pub struct Cli {
    /// Configuration file (defaults to `AMSYNC_CONFIG`, then /etc/amsync/amsync.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Named automount container to target.
    #[arg(long, global = true, value_name = "NAME")]
    pub mode: Option<String>,

    /// Named flat-file map directory to read.
    #[arg(long, global = true, value_name = "NAME")]
    pub source: Option<String>,

    /// Serve directory calls from a recorded cassette instead of a server.
    #[arg(long, global = true, value_name = "CASSETTE")]
    pub replay: Option<PathBuf>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Make the directory match the flat files.
    Sync {
        /// Maps whose entries to sync; all maps when omitted.
        maps: Vec<String>,
        /// Log the changes without making them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Check preconditions and report orphaned maps.
    Check,
    /// Print a normalized map.
    Show {
        /// Map name.
        map: String,
        /// Read the map from the directory instead of the flat files.
        #[arg(long)]
        directory: bool,
    },
}
