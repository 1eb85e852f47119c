#![forbid(unsafe_code)]

pub mod repository;
pub mod seed;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, NewVerbRecord, PendingSession, SessionRecordRow, SessionRecorder,
    SessionStatus, Storage, StorageError, VerbRepository,
};
