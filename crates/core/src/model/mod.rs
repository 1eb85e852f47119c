mod ids;
mod question;
mod report;
mod settings;
mod snapshot;
mod verb;

pub use ids::{ParseIdError, SessionId, VerbId};
pub use question::{Archetype, FieldKey, FieldSpec, Question};
pub use report::{PauseRecord, SessionReport, VerbErrorCount, accuracy_percent};
pub use settings::{QuizMode, QuizSettings, SettingsError};
pub use snapshot::{PauseSnapshot, SnapshotError};
pub use verb::{Verb, VerbError};
