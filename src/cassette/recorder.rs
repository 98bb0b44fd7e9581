//! Accumulates interactions and writes them out as a cassette.

use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;

use super::format::{Cassette, Interaction};

/// Collects interactions in call order and writes a YAML cassette.
#[derive(Debug)]
pub struct CassetteRecorder {
    path: PathBuf,
    name: String,
    container: String,
    interactions: Vec<Interaction>,
}

impl CassetteRecorder {
    /// Create a recorder that will write to `path`.
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            container: container.into(),
            interactions: Vec::new(),
        }
    }

    /// Number of interactions captured so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// Returns `true` if nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Record a call and its `Result`, using the `{"Ok": ..}` / `{"Err": ..}`
    /// convention the replayer reads back.
    pub fn record_result<I, T, E>(
        &mut self,
        port: &str,
        method: &str,
        input: &I,
        result: &Result<T, E>,
    ) where
        I: Serialize,
        T: Serialize,
        E: Serialize,
    {
        let output = match result {
            Ok(value) => serde_json::json!({ "Ok": to_value(value) }),
            Err(err) => serde_json::json!({ "Err": to_value(err) }),
        };
        self.interactions.push(Interaction {
            seq: self.interactions.len() as u64,
            port: port.to_string(),
            method: method.to_string(),
            input: to_value(input),
            output,
        });
    }

    /// Write the cassette YAML file to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn finish(self) -> Result<PathBuf, std::io::Error> {
        let cassette = Cassette {
            name: self.name,
            recorded_at: Utc::now(),
            container: self.container,
            interactions: self.interactions,
        };
        let yaml = serde_yaml::to_string(&cassette).map_err(std::io::Error::other)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, yaml)?;
        Ok(self.path)
    }
}

fn to_value<T: Serialize>(value: &T) -> serde_json::Value {
    // Port inputs and outputs are plain data; a failure here means a
    // non-string map key, which none of them have.
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}
