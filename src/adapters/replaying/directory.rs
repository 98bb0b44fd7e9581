//! Replaying adapter for the `Directory` port.

use std::sync::Mutex;

use crate::adapters::recording::directory::{AddInput, DeleteInput, SearchInput, PORT};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::directory::{Attributes, Directory, DirectoryEntry, DirectoryError, Scope};

/// Answers directory calls from a cassette.
///
/// Replay failures (exhausted or diverging cassette) surface as
/// [`DirectoryError::Other`], which the engine treats as fatal.
pub struct ReplayingDirectory {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingDirectory {
    /// Creates a replaying directory from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }

    fn replay<I: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        input: &I,
    ) -> Result<T, DirectoryError> {
        let mut replayer = self
            .replayer
            .lock()
            .map_err(|_| DirectoryError::Other("replayer lock poisoned".into()))?;
        replayer
            .next_result(PORT, method, input)
            .map_err(|e| DirectoryError::Other(e.to_string()))?
    }
}

impl Directory for ReplayingDirectory {
    fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &str,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        self.replay("search", &SearchInput { base, scope, filter })
    }

    fn add(&self, dn: &str, attrs: &Attributes) -> Result<(), DirectoryError> {
        self.replay("add", &AddInput { dn, attrs })
    }

    fn delete(&self, dn: &str) -> Result<(), DirectoryError> {
        self.replay("delete", &DeleteInput { dn })
    }
}
