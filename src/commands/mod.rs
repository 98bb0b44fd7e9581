//! Command dispatch and handlers.

pub mod check;
pub mod show;
pub mod sync;

use std::env;
use std::path::PathBuf;

use tracing::debug;

use crate::cassette::session::RecordingSession;
use crate::cli::{Cli, Command};
use crate::config::{self, Config};
use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::logging;

/// Dispatch a parsed command to its handler.
///
/// Loads the configuration, installs logging and builds the context.
/// `--replay` serves directory calls from a cassette; otherwise, when
/// `AMSYNC_RECORD` is set to a file path, every directory call of the live
/// run is recorded there.
///
/// # Errors
///
/// Returns configuration, connection and command errors.
pub fn dispatch(cli: &Cli) -> Result<()> {
    let path = config::config_path(cli.config.as_deref());
    let config = Config::load(&path)?;
    logging::init(&config.logging)?;
    debug!(config = %path.display(), "configuration loaded");
    let settings = config.resolve(cli.mode.as_deref(), cli.source.as_deref())?;

    if let Some(cassette) = &cli.replay {
        let ctx = ServiceContext::replaying(settings, cassette)?;
        return dispatch_with_context(&cli.command, &ctx);
    }

    if let Ok(record) = env::var("AMSYNC_RECORD") {
        let (ctx, session) =
            ServiceContext::recording(settings, &config.ldap, &PathBuf::from(record))?;
        let result = dispatch_with_context(&cli.command, &ctx);

        // Finish recording after the command completes, even on error.
        drop(ctx);
        finish_recording(session)?;
        return result;
    }

    let ctx = ServiceContext::live(settings, &config.ldap)?;
    dispatch_with_context(&cli.command, &ctx)
}

/// Dispatch a command with the given service context.
///
/// # Errors
///
/// Returns the error of the command that ran.
pub fn dispatch_with_context(command: &Command, ctx: &ServiceContext) -> Result<()> {
    match command {
        Command::Sync { maps, dry_run } => sync::run(ctx, maps, *dry_run),
        Command::Check => check::run(ctx),
        Command::Show { map, directory } => show::run(ctx, map, *directory),
    }
}

/// Finish a recording session and print the cassette path.
fn finish_recording(session: RecordingSession) -> Result<()> {
    let written = session.finish().map_err(Error::Config)?;
    eprintln!("Recording saved to: {}", written.display());
    Ok(())
}
