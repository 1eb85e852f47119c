#![forbid(unsafe_code)]

pub mod error;
pub mod quiz;

pub use verbs_core::Clock;

pub use error::SessionError;
pub use quiz::{
    AnswerOutcome, FieldAnswers, FieldResult, QuizLoopService, QuizProgress, QuizSession,
    QuizStatus, RoundEngine, RoundOutcome, RoundPhase, RoundTransition,
};
