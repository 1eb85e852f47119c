use thiserror::Error;

use crate::model::{SettingsError, SnapshotError, VerbError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Verb(#[from] VerbError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
