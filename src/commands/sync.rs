//! `amsync sync` command.

use std::fmt::Write;

use crate::context::ServiceContext;
use crate::error::Result;
use crate::sync::{format_actions, Reconciler, SyncReport};

/// Execute the `sync` command.
///
/// # Errors
///
/// Returns the first fatal error of the run.
pub fn run(ctx: &ServiceContext, maps: &[String], dry_run: bool) -> Result<()> {
    let report = Reconciler::new(ctx, dry_run).run(maps)?;
    println!("{}", render(&report, dry_run));
    Ok(())
}

/// Renders the report printed at the end of a run.
#[must_use]
pub fn render(report: &SyncReport, dry_run: bool) -> String {
    let heading = if dry_run { "Dry run — would perform:" } else { "Sync complete:" };
    let mut out = format!("{heading}\n{}", format_actions(&report.actions));
    if !report.retried.is_empty() {
        let _ = write!(out, "\nRetried after conflicts: {}", report.retried.join(", "));
    }
    out
}
