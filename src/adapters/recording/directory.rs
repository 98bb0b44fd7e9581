//! Recording adapter for the `Directory` port.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::cassette::recorder::CassetteRecorder;
use crate::ports::directory::{Attributes, Directory, DirectoryEntry, DirectoryError, Scope};

/// Port name used in cassettes for directory calls.
pub const PORT: &str = "directory";

/// Records directory interactions while delegating to an inner implementation.
pub struct RecordingDirectory {
    inner: Box<dyn Directory>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingDirectory {
    /// Wraps `inner`, appending every call to `recorder`.
    pub fn new(inner: Box<dyn Directory>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }

    fn record<I: Serialize, T: Serialize>(
        &self,
        method: &str,
        input: &I,
        result: &Result<T, DirectoryError>,
    ) {
        // A poisoned recorder only loses the cassette, never the live call.
        if let Ok(mut recorder) = self.recorder.lock() {
            recorder.record_result(PORT, method, input, result);
        }
    }
}

/// Arguments of a `search` call as stored in a cassette.
#[derive(Serialize)]
pub(crate) struct SearchInput<'a> {
    pub(crate) base: &'a str,
    pub(crate) scope: Scope,
    pub(crate) filter: &'a str,
}

/// Arguments of an `add` call as stored in a cassette.
#[derive(Serialize)]
pub(crate) struct AddInput<'a> {
    pub(crate) dn: &'a str,
    pub(crate) attrs: &'a Attributes,
}

/// Arguments of a `delete` call as stored in a cassette.
#[derive(Serialize)]
pub(crate) struct DeleteInput<'a> {
    pub(crate) dn: &'a str,
}

impl Directory for RecordingDirectory {
    fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &str,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let result = self.inner.search(base, scope, filter);
        self.record("search", &SearchInput { base, scope, filter }, &result);
        result
    }

    fn add(&self, dn: &str, attrs: &Attributes) -> Result<(), DirectoryError> {
        let result = self.inner.add(dn, attrs);
        self.record("add", &AddInput { dn, attrs }, &result);
        result
    }

    fn delete(&self, dn: &str) -> Result<(), DirectoryError> {
        let result = self.inner.delete(dn);
        self.record("delete", &DeleteInput { dn }, &result);
        result
    }
}
