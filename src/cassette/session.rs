//! Recording session owning the directory cassette of a live run.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::warn;

use super::recorder::CassetteRecorder;

/// Owns the recorder shared with the recording directory adapter.
///
/// Finish the session only after the context holding the adapter has been
/// dropped, so the recorder has a single owner again.
pub struct RecordingSession {
    /// Recorder for directory interactions.
    pub directory: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingSession {
    /// Create a session writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, container: &str) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map_or_else(|| "amsync".to_string(), |s| s.to_string_lossy().into_owned());
        Self { directory: Arc::new(Mutex::new(CassetteRecorder::new(path, name, container))) }
    }

    /// Write the cassette to disk. An empty cassette is still written, with a
    /// warning, since replaying it fails on the first directory call.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter is still alive or the write fails.
    pub fn finish(self) -> Result<PathBuf, String> {
        let recorder = Arc::try_unwrap(self.directory)
            .map_err(|_| "Recording directory adapter still has references".to_string())?
            .into_inner()
            .map_err(|e| format!("Recorder lock poisoned: {e}"))?;
        if recorder.is_empty() {
            warn!("no directory calls were recorded");
        }
        recorder.finish().map_err(|e| format!("Failed to write directory cassette: {e}"))
    }
}
