use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{SessionId, VerbId};
use crate::model::settings::QuizMode;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot cursor {current_index} is past the pool length {pool_len}")]
    CursorOutOfRange { current_index: usize, pool_len: usize },

    #[error("snapshot counts are inconsistent: {0}")]
    Inconsistent(&'static str),
}

/// Everything needed to continue a paused quiz.
///
/// Verbs are stored by id only; they are resolved against the catalog on resume.
/// The JSON field names are the stored format and must stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseSnapshot {
    pub session_id: Option<SessionId>,
    pub round_number: u32,
    pub global_correct: u32,
    pub global_total: u32,
    #[serde(default)]
    pub error_tally: BTreeMap<VerbId, u32>,
    pub pool: Vec<VerbId>,
    #[serde(default)]
    pub retry: Vec<VerbId>,
    pub current_index: usize,
    pub round_correct: u32,
    #[serde(default)]
    pub mode: QuizMode,
}

impl PauseSnapshot {
    /// Encode as the stored JSON object.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode and validate a stored JSON object.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` if the JSON is malformed or the counters contradict
    /// each other.
    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(raw)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check the invariants a resumed session relies on.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::CursorOutOfRange` or `SnapshotError::Inconsistent`.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.current_index > self.pool.len() {
            return Err(SnapshotError::CursorOutOfRange {
                current_index: self.current_index,
                pool_len: self.pool.len(),
            });
        }
        if self.global_correct > self.global_total {
            return Err(SnapshotError::Inconsistent(
                "global_correct exceeds global_total",
            ));
        }
        let round_answered = u32::try_from(self.current_index).unwrap_or(u32::MAX);
        if self.round_correct > round_answered {
            return Err(SnapshotError::Inconsistent(
                "round_correct exceeds answered verbs",
            ));
        }
        Ok(())
    }

    /// Sum of all per-verb error counts.
    #[must_use]
    pub fn total_errors(&self) -> u32 {
        self.error_tally
            .values()
            .fold(0_u32, |acc, n| acc.saturating_add(*n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORED: &str = r#"{
        "session_id": 12,
        "round_number": 2,
        "global_correct": 40,
        "global_total": 55,
        "error_tally": { "7": 2, "12": 1 },
        "pool": [7, 12, 31],
        "retry": [7],
        "current_index": 1,
        "round_correct": 0,
        "mode": "random"
    }"#;

    #[test]
    fn decodes_stored_snapshot() {
        let snapshot = PauseSnapshot::from_json(STORED).unwrap();
        assert_eq!(snapshot.session_id, Some(SessionId::new(12)));
        assert_eq!(snapshot.error_tally.get(&VerbId::new(7)), Some(&2));
        assert_eq!(snapshot.pool, vec![VerbId::new(7), VerbId::new(12), VerbId::new(31)]);
        assert_eq!(snapshot.total_errors(), 3);
    }

    #[test]
    fn missing_mode_defaults_to_random() {
        let raw = r#"{"session_id":null,"round_number":1,"global_correct":0,
            "global_total":0,"pool":[1,2],"current_index":0,"round_correct":0}"#;
        let snapshot = PauseSnapshot::from_json(raw).unwrap();
        assert_eq!(snapshot.mode, QuizMode::Random);
        assert!(snapshot.retry.is_empty());
        assert!(snapshot.error_tally.is_empty());
    }

    #[test]
    fn encoded_json_uses_stable_field_names() {
        let snapshot = PauseSnapshot::from_json(STORED).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(value["round_number"], 2);
        assert_eq!(value["error_tally"]["7"], 2);
        assert_eq!(value["retry"][0], 7);
        assert_eq!(value["mode"], "random");
    }

    #[test]
    fn rejects_cursor_past_pool() {
        let raw = r#"{"session_id":1,"round_number":1,"global_correct":0,
            "global_total":0,"pool":[1],"current_index":2,"round_correct":0}"#;
        assert!(matches!(
            PauseSnapshot::from_json(raw),
            Err(SnapshotError::CursorOutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_more_correct_than_answered() {
        let raw = r#"{"session_id":1,"round_number":1,"global_correct":5,
            "global_total":3,"pool":[1],"current_index":0,"round_correct":0}"#;
        assert!(matches!(
            PauseSnapshot::from_json(raw),
            Err(SnapshotError::Inconsistent(_))
        ));
    }
}
