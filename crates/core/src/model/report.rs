use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::ids::VerbId;
use crate::model::snapshot::PauseSnapshot;

/// Number of times a verb was missed during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerbErrorCount {
    pub verb_id: VerbId,
    pub errors: u32,
}

/// Final statistics of a won session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub rounds: u32,
    pub total_correct: u32,
    pub total_answered: u32,
    pub total_errors: u32,
    pub accuracy_percent: u32,
    pub verb_errors: Vec<VerbErrorCount>,
}

impl SessionReport {
    #[must_use]
    pub fn new(
        rounds: u32,
        total_correct: u32,
        total_answered: u32,
        error_tally: &BTreeMap<VerbId, u32>,
    ) -> Self {
        let verb_errors: Vec<_> = error_tally
            .iter()
            .map(|(verb_id, errors)| VerbErrorCount {
                verb_id: *verb_id,
                errors: *errors,
            })
            .collect();
        let total_errors = verb_errors
            .iter()
            .fold(0_u32, |acc, v| acc.saturating_add(v.errors));

        Self {
            rounds,
            total_correct,
            total_answered,
            total_errors,
            accuracy_percent: accuracy_percent(total_correct, total_answered),
            verb_errors,
        }
    }
}

/// Rounded share of correct answers; a session with no answers counts as 100%.
#[must_use]
pub fn accuracy_percent(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 100;
    }
    let correct = u64::from(correct.min(total));
    let total = u64::from(total);
    let rounded = (correct * 200 + total) / (total * 2);
    u32::try_from(rounded).unwrap_or(100)
}

/// Payload sent to the recorder when a session is paused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PauseRecord {
    pub snapshot: PauseSnapshot,
    pub total_correct: u32,
    pub total_errors: u32,
    pub rounds: u32,
}

impl PauseRecord {
    #[must_use]
    pub fn from_snapshot(snapshot: PauseSnapshot) -> Self {
        Self {
            total_correct: snapshot.global_correct,
            total_errors: snapshot.total_errors(),
            rounds: snapshot.round_number,
            snapshot,
        }
    }
}
