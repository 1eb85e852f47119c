use sqlx::Row;
use verbs_core::model::{SessionId, Verb, VerbId};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn verb_id_from_i64(v: i64) -> Result<VerbId, StorageError> {
    Ok(VerbId::new(i64_to_u64("verb_id", v)?))
}

pub(crate) fn session_id_from_i64(v: i64) -> Result<SessionId, StorageError> {
    Ok(SessionId::new(i64_to_u64("session_id", v)?))
}

pub(crate) fn map_verb_row(row: &sqlx::sqlite::SqliteRow) -> Result<Verb, StorageError> {
    let id = verb_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    Verb::new(
        id,
        row.try_get::<String, _>("infinitive").map_err(ser)?,
        row.try_get::<String, _>("past_simple").map_err(ser)?,
        row.try_get::<String, _>("past_participle").map_err(ser)?,
        row.try_get::<String, _>("french").map_err(ser)?,
    )
    .map_err(ser)
}
