//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use verbs_core::model::{SnapshotError, VerbId};

/// Errors emitted by the quiz session and its orchestration.
///
/// Call-order violations (`AlreadyAnswered` through `Busy`) leave the session untouched;
/// the caller should resynchronize its view with the session state.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no verbs available for a quiz")]
    Empty,
    #[error("current question was already answered")]
    AlreadyAnswered,
    #[error("current question has not been answered yet")]
    NotAnswered,
    #[error("round is complete")]
    RoundComplete,
    #[error("round is still in progress")]
    RoundInProgress,
    #[error("answers are for verb {got}, current verb is {expected}")]
    QuestionMismatch { expected: VerbId, got: VerbId },
    #[error("session already completed")]
    Completed,
    #[error("session is paused")]
    Paused,
    #[error("no paused session to resume")]
    NoPendingSession,
    #[error("session has no recorder id and cannot be paused")]
    NotRecorded,
    #[error("another session operation is in progress")]
    Busy,
    #[error("verb catalog unavailable: {0}")]
    Catalog(#[source] StorageError),
    #[error("session recorder unavailable: {0}")]
    Recorder(#[source] StorageError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl SessionError {
    /// True for errors caused by calling an operation out of sequence.
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(
            self,
            SessionError::AlreadyAnswered
                | SessionError::NotAnswered
                | SessionError::RoundComplete
                | SessionError::RoundInProgress
                | SessionError::QuestionMismatch { .. }
                | SessionError::Completed
                | SessionError::Paused
                | SessionError::NoPendingSession
                | SessionError::NotRecorded
                | SessionError::Busy
        )
    }
}
