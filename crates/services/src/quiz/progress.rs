use serde::Serialize;

/// Snapshot of where a quiz stands, for renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizProgress {
    pub round_number: u32,
    /// Zero-based index of the verb being asked in this round.
    pub current_index: usize,
    pub round_total: usize,
    pub round_correct: u32,
    pub round_errors: usize,
    pub global_correct: u32,
    pub global_total: u32,
    pub is_answered: bool,
    pub is_round_complete: bool,
}
