use chrono::{DateTime, Utc};
use sqlx::Row;
use verbs_core::model::{PauseRecord, PauseSnapshot, SessionId, SessionReport, VerbErrorCount};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, ser, session_id_from_i64, u32_from_i64, verb_id_from_i64};
use crate::repository::{
    PendingSession, SessionRecordRow, SessionRecorder, SessionStatus, StorageError,
};

fn decode_snapshot(raw: &str) -> Result<PauseSnapshot, StorageError> {
    PauseSnapshot::from_json(raw).map_err(ser)
}

fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionRecordRow, StorageError> {
    let id = session_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let status = SessionStatus::parse(row.try_get::<String, _>("status").map_err(ser)?.as_str())?;
    let snapshot = row
        .try_get::<Option<String>, _>("snapshot")
        .map_err(ser)?
        .as_deref()
        .map(decode_snapshot)
        .transpose()?;

    Ok(SessionRecordRow {
        id,
        status,
        started_at: row.try_get("started_at").map_err(ser)?,
        paused_at: row.try_get("paused_at").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
        total_correct: u32_from_i64(
            "total_correct",
            row.try_get::<i64, _>("total_correct").map_err(ser)?,
        )?,
        total_errors: u32_from_i64(
            "total_errors",
            row.try_get::<i64, _>("total_errors").map_err(ser)?,
        )?,
        rounds: u32_from_i64("rounds", row.try_get::<i64, _>("rounds").map_err(ser)?)?,
        snapshot,
        verb_errors: Vec::new(),
    })
}

impl SqliteRepository {
    async fn session_status(&self, id: i64) -> Result<SessionStatus, StorageError> {
        let row = sqlx::query("SELECT status FROM quiz_sessions WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        SessionStatus::parse(row.try_get::<String, _>("status").map_err(ser)?.as_str())
    }
}

#[async_trait::async_trait]
impl SessionRecorder for SqliteRepository {
    async fn create_session(&self, started_at: DateTime<Utc>) -> Result<SessionId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO quiz_sessions (status, started_at)
                VALUES (?1, ?2)
            ",
        )
        .bind(SessionStatus::Active.as_str())
        .bind(started_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        session_id_from_i64(res.last_insert_rowid())
    }

    async fn save_pause(
        &self,
        id: SessionId,
        record: &PauseRecord,
        paused_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let session_id = id_i64("session_id", id.value())?;
        if self.session_status(session_id).await? == SessionStatus::Completed {
            return Err(StorageError::Conflict);
        }
        let snapshot = record.snapshot.to_json().map_err(ser)?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
                UPDATE quiz_sessions
                SET status = 'active'
                WHERE status = 'paused' AND id <> ?1
            ",
        )
        .bind(session_id)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query(
            r"
                UPDATE quiz_sessions
                SET status = 'paused',
                    paused_at = ?2,
                    total_correct = ?3,
                    total_errors = ?4,
                    rounds = ?5,
                    snapshot = ?6
                WHERE id = ?1
            ",
        )
        .bind(session_id)
        .bind(paused_at)
        .bind(i64::from(record.total_correct))
        .bind(i64::from(record.total_errors))
        .bind(i64::from(record.rounds))
        .bind(snapshot)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn pending_session(&self) -> Result<Option<PendingSession>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, paused_at, started_at, snapshot
                FROM quiz_sessions
                WHERE status = 'paused'
                ORDER BY paused_at DESC, id DESC
                LIMIT 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id = session_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
        let raw: Option<String> = row.try_get("snapshot").map_err(ser)?;
        let raw = raw.ok_or_else(|| {
            StorageError::Serialization("paused session without snapshot".into())
        })?;
        let paused_at: Option<DateTime<Utc>> = row.try_get("paused_at").map_err(ser)?;
        let started_at: DateTime<Utc> = row.try_get("started_at").map_err(ser)?;

        Ok(Some(PendingSession {
            id,
            snapshot: decode_snapshot(&raw)?,
            paused_at: paused_at.unwrap_or(started_at),
        }))
    }

    async fn mark_resumed(&self, id: SessionId) -> Result<(), StorageError> {
        let session_id = id_i64("session_id", id.value())?;
        if self.session_status(session_id).await? != SessionStatus::Paused {
            return Ok(());
        }

        sqlx::query("UPDATE quiz_sessions SET status = 'active' WHERE id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }

    async fn record_final(
        &self,
        id: SessionId,
        report: &SessionReport,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let session_id = id_i64("session_id", id.value())?;
        self.session_status(session_id).await?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
                UPDATE quiz_sessions
                SET status = 'completed',
                    completed_at = ?2,
                    total_correct = ?3,
                    total_errors = ?4,
                    rounds = ?5,
                    snapshot = NULL
                WHERE id = ?1
            ",
        )
        .bind(session_id)
        .bind(completed_at)
        .bind(i64::from(report.total_correct))
        .bind(i64::from(report.total_errors))
        .bind(i64::from(report.rounds))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM session_verb_errors WHERE session_id = ?1")
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for entry in &report.verb_errors {
            sqlx::query(
                r"
                    INSERT INTO session_verb_errors (session_id, verb_id, errors)
                    VALUES (?1, ?2, ?3)
                ",
            )
            .bind(session_id)
            .bind(id_i64("verb_id", entry.verb_id.value())?)
            .bind(i64::from(entry.errors))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<SessionRecordRow, StorageError> {
        let session_id = id_i64("session_id", id.value())?;
        let row = sqlx::query(
            r"
                SELECT
                    id, status, started_at, paused_at, completed_at,
                    total_correct, total_errors, rounds, snapshot
                FROM quiz_sessions
                WHERE id = ?1
            ",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        let mut record = map_session_row(&row)?;

        let error_rows = sqlx::query(
            r"
                SELECT verb_id, errors
                FROM session_verb_errors
                WHERE session_id = ?1
                ORDER BY verb_id ASC
            ",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        for row in error_rows {
            record.verb_errors.push(VerbErrorCount {
                verb_id: verb_id_from_i64(row.try_get::<i64, _>("verb_id").map_err(ser)?)?,
                errors: u32_from_i64("errors", row.try_get::<i64, _>("errors").map_err(ser)?)?,
            });
        }

        Ok(record)
    }
}
