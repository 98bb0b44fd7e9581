//! Cassette data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One call made through a port, with its arguments and result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Position in the recording, assigned by the recorder.
    pub seq: u64,
    /// Port the call went through (e.g. "directory").
    pub port: String,
    /// Method name invoked on the port.
    pub method: String,
    /// Call arguments.
    pub input: serde_json::Value,
    /// Result as `{"Ok": value}` or `{"Err": error}`.
    pub output: serde_json::Value,
}

/// A recorded session against one directory server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Human-readable name for this cassette.
    pub name: String,
    /// When the recording finished.
    pub recorded_at: DateTime<Utc>,
    /// Automount container the run targeted.
    pub container: String,
    /// Calls in the order they were made.
    pub interactions: Vec<Interaction>,
}

impl Cassette {
    /// Reads a cassette from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error string if the file cannot be read or parsed.
    pub fn load(path: &std::path::Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn yaml_round_trip_keeps_multiline_dns() {
        let cassette = Cassette {
            name: "sync-auto.data".into(),
            recorded_at: Utc::now(),
            container: "cn=automounts,dc=example,dc=org".into(),
            interactions: vec![Interaction {
                seq: 0,
                port: "directory".into(),
                method: "delete".into(),
                input: json!({"dn": "cn=apps\\0ACNF:1234,cn=auto.data,cn=automounts"}),
                output: json!({"Ok": null}),
            }],
        };
        let yaml = serde_yaml::to_string(&cassette).expect("serialize");
        let back: Cassette = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(cassette, back);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Cassette::load(std::path::Path::new("/nonexistent/amsync.cassette.yaml"));
        assert!(err.unwrap_err().contains("Failed to read cassette file"));
    }
}
