//! Tracing subscriber setup.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Installs the global subscriber.
///
/// Logs go to stderr in compact form, so stdout only carries command output.
/// `RUST_LOG` overrides the configured level. When `config.file` is set,
/// every line is also appended to that file without ANSI colours.
///
/// Installing twice in one process is harmless; the first subscriber stays.
///
/// # Errors
///
/// Returns [`Error::Config`] for an invalid level directive, or
/// [`Error::Io`] if the log file cannot be opened.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::Config(format!("logging.level: {e}")))?;

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false).compact();

    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| Error::Io { path: path.clone(), message: e.to_string() })?;
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        }
        None => None,
    };

    if tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}
