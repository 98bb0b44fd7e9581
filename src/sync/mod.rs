//! Reconciliation of the directory mirror against the flat-file maps.

pub mod conflict;
pub mod delta;
pub mod engine;

pub use conflict::ConflictDetector;
pub use delta::Delta;
pub use engine::Reconciler;

/// One change made (or, in a dry run, planned) to the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// A map container was created.
    CreateContainer {
        /// Map name.
        map: String,
    },
    /// A map container without a flat file was deleted with its entries.
    DeleteContainer {
        /// Map name.
        map: String,
    },
    /// A missing entry was created.
    Create {
        /// Map name.
        map: String,
        /// Entry key.
        key: String,
    },
    /// An entry without a flat-file line was deleted.
    Delete {
        /// Map name.
        map: String,
        /// Entry key.
        key: String,
    },
    /// A drifted entry was deleted and recreated.
    Replace {
        /// Map name.
        map: String,
        /// Entry key.
        key: String,
    },
    /// A replication-conflict object was deleted.
    RemoveConflict {
        /// Map name.
        map: String,
        /// DN of the conflict object.
        dn: String,
    },
}

/// Everything one run did, in order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Actions in the order they were taken.
    pub actions: Vec<SyncAction>,
    /// Maps whose content pass ran a second time.
    pub retried: Vec<String>,
}

impl SyncReport {
    /// Appends an action.
    pub fn push(&mut self, action: SyncAction) {
        self.actions.push(action);
    }

    /// Returns `true` if the directory was left as it was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Number of conflict objects removed.
    #[must_use]
    pub fn conflicts_removed(&self) -> usize {
        self.actions.iter().filter(|a| matches!(a, SyncAction::RemoveConflict { .. })).count()
    }
}

/// Formats sync actions as a human-readable report.
#[must_use]
pub fn format_actions(actions: &[SyncAction]) -> String {
    if actions.is_empty() {
        return "Directory already matches the flat files.".to_string();
    }

    actions
        .iter()
        .map(|action| match action {
            SyncAction::CreateContainer { map } => format!("  CREATE MAP {map}"),
            SyncAction::DeleteContainer { map } => format!("  DELETE MAP {map}"),
            SyncAction::Create { map, key } => format!("  CREATE {map}: {key}"),
            SyncAction::Delete { map, key } => format!("  DELETE {map}: {key}"),
            SyncAction::Replace { map, key } => format!("  REPLACE {map}: {key}"),
            SyncAction::RemoveConflict { map, dn } => {
                format!("  CONFLICT {map}: {}", dn.replace('\n', "\\n"))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
