//! `amsync check` command.

use crate::context::ServiceContext;
use crate::error::Result;
use crate::source::Orphans;
use crate::sync::Reconciler;

/// Execute the `check` command: preflight only, nothing is written.
///
/// # Errors
///
/// Returns the failed precondition, if any.
pub fn run(ctx: &ServiceContext) -> Result<()> {
    let orphans = Reconciler::new(ctx, true).preflight()?;
    println!("{}", render(&orphans));
    Ok(())
}

/// Renders the preflight findings.
#[must_use]
pub fn render(orphans: &Orphans) -> String {
    if orphans.is_empty() {
        return "Preconditions met; every map is accounted for.".to_string();
    }
    let mut lines = vec!["Preconditions met.".to_string()];
    if !orphans.unused.is_empty() {
        lines.push("Maps not referenced from the master map:".to_string());
        lines.extend(orphans.unused.iter().map(|name| format!("  {name}")));
    }
    if !orphans.missing.is_empty() {
        lines.push("Maps referenced from the master map with no flat file:".to_string());
        lines.extend(orphans.missing.iter().map(|name| format!("  {name}")));
    }
    lines.join("\n")
}
