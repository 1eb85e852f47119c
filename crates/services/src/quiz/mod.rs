mod progress;
mod round;
mod session;
mod workflow;

// Public API of the quiz subsystem.
pub use progress::QuizProgress;
pub use round::{AnswerOutcome, FieldAnswers, FieldResult, RoundEngine, RoundPhase};
pub use session::{QuizSession, QuizStatus, RoundTransition};
pub use workflow::{QuizLoopService, RoundOutcome};
