#![forbid(unsafe_code)]

pub mod answer;
pub mod error;
pub mod generator;
pub mod model;
pub mod time;

pub use answer::check as check_answer;
pub use error::Error;
pub use generator::QuestionGenerator;
pub use model::{
    Archetype, FieldKey, FieldSpec, PauseRecord, PauseSnapshot, Question, QuizMode,
    QuizSettings, SessionId, SessionReport, SettingsError, SnapshotError, Verb, VerbError,
    VerbId,
};
pub use time::Clock;
