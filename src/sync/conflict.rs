//! Removal of replication-conflict objects.

use crate::error::Result;
use crate::source::DirectorySource;

use super::{SyncAction, SyncReport};

/// Finds and deletes conflict objects under a map container.
pub struct ConflictDetector<'s, 'a> {
    directory: &'s DirectorySource<'a>,
}

impl<'s, 'a> ConflictDetector<'s, 'a> {
    /// Creates a detector working through `directory`.
    #[must_use]
    pub fn new(directory: &'s DirectorySource<'a>) -> Self {
        Self { directory }
    }

    /// Deletes every conflict object under map `name`.
    ///
    /// Returns `true` if any were found. A missing map container has none.
    ///
    /// # Errors
    ///
    /// Propagates failures reading the map or deleting an object.
    pub fn scan_and_clean(&self, name: &str, report: &mut SyncReport) -> Result<bool> {
        let Some(listing) = self.directory.read_map(name)? else {
            return Ok(false);
        };
        for conflict in &listing.conflicts {
            self.directory.delete_conflict(conflict)?;
            report.push(SyncAction::RemoveConflict {
                map: name.to_string(),
                dn: conflict.dn.clone(),
            });
        }
        Ok(!listing.conflicts.is_empty())
    }
}
