//! Serves recorded interactions back in order.

use std::collections::{HashMap, VecDeque};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::format::{Cassette, Interaction};

/// Why a replayed call could not be answered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// No recorded interaction is left for this port/method.
    #[error("cassette exhausted: no interactions left for {port}::{method}")]
    Exhausted {
        /// Port called.
        port: String,
        /// Method called.
        method: String,
    },
    /// The call's arguments differ from what was recorded.
    #[error("cassette mismatch at seq {seq} for {port}::{method}: recorded {recorded}, got {actual}")]
    Mismatch {
        /// Sequence number of the recorded interaction.
        seq: u64,
        /// Port called.
        port: String,
        /// Method called.
        method: String,
        /// Recorded arguments.
        recorded: serde_json::Value,
        /// Arguments of the live call.
        actual: serde_json::Value,
    },
    /// The recorded output does not fit the expected result type.
    #[error("cassette output at seq {seq} is malformed: {message}")]
    Malformed {
        /// Sequence number of the recorded interaction.
        seq: u64,
        /// Decoding failure.
        message: String,
    },
}

/// Replays a cassette, one FIFO queue per port/method pair.
///
/// Each call must carry the same arguments it was recorded with, so a run
/// that diverges from the recording fails at the first differing call.
pub struct CassetteReplayer {
    queues: HashMap<(String, String), VecDeque<Interaction>>,
}

impl CassetteReplayer {
    /// Create a replayer from a loaded cassette.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<(String, String), VecDeque<Interaction>> = HashMap::new();
        for interaction in &cassette.interactions {
            queues
                .entry((interaction.port.clone(), interaction.method.clone()))
                .or_default()
                .push_back(interaction.clone());
        }
        Self { queues }
    }

    /// Interactions not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    /// Consume the next interaction for `port::method` and decode its result.
    ///
    /// The outer `Result` reports replay failures; the inner one is the
    /// recorded outcome of the call.
    ///
    /// # Errors
    ///
    /// Returns a [`ReplayError`] when the queue is empty, the arguments
    /// differ from the recording, or the output cannot be decoded.
    pub fn next_result<I, T, E>(
        &mut self,
        port: &str,
        method: &str,
        input: &I,
    ) -> Result<Result<T, E>, ReplayError>
    where
        I: Serialize,
        T: DeserializeOwned,
        E: DeserializeOwned,
    {
        let interaction = self
            .queues
            .get_mut(&(port.to_string(), method.to_string()))
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| ReplayError::Exhausted {
                port: port.to_string(),
                method: method.to_string(),
            })?;

        let actual = serde_json::to_value(input)
            .map_err(|e| ReplayError::Malformed { seq: interaction.seq, message: e.to_string() })?;
        if actual != interaction.input {
            return Err(ReplayError::Mismatch {
                seq: interaction.seq,
                port: port.to_string(),
                method: method.to_string(),
                recorded: interaction.input,
                actual,
            });
        }

        let malformed =
            |message: String| ReplayError::Malformed { seq: interaction.seq, message };
        if let Some(err) = interaction.output.get("Err") {
            let err = serde_json::from_value(err.clone()).map_err(|e| malformed(e.to_string()))?;
            return Ok(Err(err));
        }
        let value = interaction
            .output
            .get("Ok")
            .ok_or_else(|| malformed("expected an Ok or Err key".to_string()))?;
        let value = serde_json::from_value(value.clone()).map_err(|e| malformed(e.to_string()))?;
        Ok(Ok(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn cassette(interactions: Vec<Interaction>) -> Cassette {
        Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            container: "cn=automounts".into(),
            interactions,
        }
    }

    fn interaction(
        seq: u64,
        method: &str,
        input: serde_json::Value,
        output: serde_json::Value,
    ) -> Interaction {
        Interaction { seq, port: "directory".into(), method: method.into(), input, output }
    }

    #[test]
    fn serves_each_method_in_recorded_order() {
        let mut replayer = CassetteReplayer::new(&cassette(vec![
            interaction(0, "delete", json!({"dn": "cn=a"}), json!({"Ok": null})),
            interaction(1, "add", json!({"dn": "cn=b"}), json!({"Err": "boom"})),
            interaction(2, "delete", json!({"dn": "cn=c"}), json!({"Err": "gone"})),
        ]));

        let first: Result<(), String> =
            replayer.next_result("directory", "delete", &json!({"dn": "cn=a"})).unwrap();
        assert_eq!(first, Ok(()));
        let added: Result<(), String> =
            replayer.next_result("directory", "add", &json!({"dn": "cn=b"})).unwrap();
        assert_eq!(added, Err("boom".to_string()));
        let second: Result<(), String> =
            replayer.next_result("directory", "delete", &json!({"dn": "cn=c"})).unwrap();
        assert_eq!(second, Err("gone".to_string()));
        assert_eq!(replayer.remaining(), 0);
    }

    #[test]
    fn exhausted_queue_is_an_error() {
        let mut replayer = CassetteReplayer::new(&cassette(vec![]));
        let err = replayer
            .next_result::<_, (), String>("directory", "search", &json!({}))
            .unwrap_err();
        assert!(matches!(err, ReplayError::Exhausted { .. }));
        assert!(err.to_string().contains("directory::search"));
    }

    #[test]
    fn diverging_arguments_are_a_mismatch() {
        let mut replayer = CassetteReplayer::new(&cassette(vec![interaction(
            7,
            "delete",
            json!({"dn": "cn=a"}),
            json!({"Ok": null}),
        )]));
        let err = replayer
            .next_result::<_, (), String>("directory", "delete", &json!({"dn": "cn=z"}))
            .unwrap_err();
        assert!(matches!(err, ReplayError::Mismatch { seq: 7, .. }));
    }
}
