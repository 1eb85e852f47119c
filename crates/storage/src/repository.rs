use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use verbs_core::model::{
    PauseRecord, PauseSnapshot, SessionId, SessionReport, Verb, VerbErrorCount, VerbId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Catalog entry before an id has been assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVerbRecord {
    pub infinitive: String,
    pub past_simple: String,
    pub past_participle: String,
    pub french: String,
}

impl NewVerbRecord {
    #[must_use]
    pub fn new(infinitive: &str, past_simple: &str, past_participle: &str, french: &str) -> Self {
        Self {
            infinitive: infinitive.to_string(),
            past_simple: past_simple.to_string(),
            past_participle: past_participle.to_string(),
            french: french.to_string(),
        }
    }

    /// Reject entries with a blank field.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` naming the first blank field.
    pub fn validate(&self) -> Result<(), StorageError> {
        let fields = [
            ("infinitive", &self.infinitive),
            ("past_simple", &self.past_simple),
            ("past_participle", &self.past_participle),
            ("french", &self.french),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(StorageError::Serialization(format!(
                    "verb {field} cannot be empty"
                )));
            }
        }
        Ok(())
    }

    /// Attach an id and validate the text fields.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if a field is blank.
    pub fn into_verb(self, id: VerbId) -> Result<Verb, StorageError> {
        Verb::new(
            id,
            self.infinitive,
            self.past_simple,
            self.past_participle,
            self.french,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Lifecycle of a recorded session row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
        }
    }

    /// Parse the stored status string.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for unknown values.
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        match raw {
            "active" => Ok(SessionStatus::Active),
            "paused" => Ok(SessionStatus::Paused),
            "completed" => Ok(SessionStatus::Completed),
            _ => Err(StorageError::Serialization(format!(
                "invalid session status: {raw}"
            ))),
        }
    }
}

/// A paused session waiting to be resumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSession {
    pub id: SessionId,
    pub snapshot: PauseSnapshot,
    pub paused_at: DateTime<Utc>,
}

/// Persisted shape of a recorded session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecordRow {
    pub id: SessionId,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub paused_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_correct: u32,
    pub total_errors: u32,
    pub rounds: u32,
    pub snapshot: Option<PauseSnapshot>,
    pub verb_errors: Vec<VerbErrorCount>,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Read access to the verb catalog.
#[async_trait]
pub trait VerbRepository: Send + Sync {
    /// All verbs, ordered by infinitive then id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn list_verbs(&self) -> Result<Vec<Verb>, StorageError>;

    /// Insert catalog entries, assigning ids in order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entries cannot be stored.
    async fn insert_verbs(&self, verbs: &[NewVerbRecord]) -> Result<Vec<VerbId>, StorageError>;
}

/// Durable record of quiz sessions.
#[async_trait]
pub trait SessionRecorder: Send + Sync {
    /// Open a new session row and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be created.
    async fn create_session(&self, started_at: DateTime<Utc>) -> Result<SessionId, StorageError>;

    /// Store a pause snapshot. Any other paused session stops being pending.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown ids, or other storage errors.
    async fn save_pause(
        &self,
        id: SessionId,
        record: &PauseRecord,
        paused_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// The paused session to offer for resuming, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be read or its snapshot is malformed.
    async fn pending_session(&self) -> Result<Option<PendingSession>, StorageError>;

    /// Flag a paused session as being played again.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown ids, or other storage errors.
    async fn mark_resumed(&self, id: SessionId) -> Result<(), StorageError>;

    /// Store the final statistics of a won session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown ids, or other storage errors.
    async fn record_final(
        &self,
        id: SessionId,
        report: &SessionReport,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Fetch a recorded session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: SessionId) -> Result<SessionRecordRow, StorageError>;
}

//
// ─── IN-MEMORY ADAPTER ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct StoredSession {
    status: SessionStatus,
    started_at: DateTime<Utc>,
    paused_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    total_correct: u32,
    total_errors: u32,
    rounds: u32,
    snapshot_json: Option<String>,
    verb_errors: Vec<VerbErrorCount>,
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Snapshots are kept as JSON text, like the `SQLite` adapter does.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    verbs: Arc<Mutex<Vec<Verb>>>,
    sessions: Arc<Mutex<HashMap<SessionId, StoredSession>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository preloaded with a catalog.
    #[must_use]
    pub fn with_verbs(verbs: Vec<Verb>) -> Self {
        let repo = Self::new();
        if let Ok(mut guard) = repo.verbs.lock() {
            *guard = verbs;
        }
        repo
    }

    fn sessions(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<SessionId, StoredSession>>, StorageError> {
        self.sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn decode_snapshot(raw: &str) -> Result<PauseSnapshot, StorageError> {
    PauseSnapshot::from_json(raw).map_err(|e| StorageError::Serialization(e.to_string()))
}

#[async_trait]
impl VerbRepository for InMemoryRepository {
    async fn list_verbs(&self) -> Result<Vec<Verb>, StorageError> {
        let guard = self
            .verbs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut verbs = guard.clone();
        verbs.sort_by(|a, b| {
            a.infinitive()
                .cmp(b.infinitive())
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(verbs)
    }

    async fn insert_verbs(&self, verbs: &[NewVerbRecord]) -> Result<Vec<VerbId>, StorageError> {
        for record in verbs {
            record.validate()?;
        }
        let mut guard = self
            .verbs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut next = guard.iter().map(|v| v.id().value()).max().unwrap_or(0);
        let mut built = Vec::with_capacity(verbs.len());
        for record in verbs {
            next += 1;
            built.push(record.clone().into_verb(VerbId::new(next))?);
        }
        let ids = built.iter().map(Verb::id).collect();
        guard.extend(built);
        Ok(ids)
    }
}

#[async_trait]
impl SessionRecorder for InMemoryRepository {
    async fn create_session(&self, started_at: DateTime<Utc>) -> Result<SessionId, StorageError> {
        let mut guard = self.sessions()?;
        let next = guard.keys().map(SessionId::value).max().unwrap_or(0) + 1;
        let id = SessionId::new(next);
        guard.insert(
            id,
            StoredSession {
                status: SessionStatus::Active,
                started_at,
                paused_at: None,
                completed_at: None,
                total_correct: 0,
                total_errors: 0,
                rounds: 0,
                snapshot_json: None,
                verb_errors: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn save_pause(
        &self,
        id: SessionId,
        record: &PauseRecord,
        paused_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let json = record
            .snapshot
            .to_json()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let mut guard = self.sessions()?;
        match guard.get(&id) {
            None => return Err(StorageError::NotFound),
            Some(session) if session.status == SessionStatus::Completed => {
                return Err(StorageError::Conflict);
            }
            Some(_) => {}
        }
        for (other_id, session) in guard.iter_mut() {
            if *other_id != id && session.status == SessionStatus::Paused {
                session.status = SessionStatus::Active;
            }
        }
        let session = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        session.status = SessionStatus::Paused;
        session.paused_at = Some(paused_at);
        session.total_correct = record.total_correct;
        session.total_errors = record.total_errors;
        session.rounds = record.rounds;
        session.snapshot_json = Some(json);
        Ok(())
    }

    async fn pending_session(&self) -> Result<Option<PendingSession>, StorageError> {
        let guard = self.sessions()?;
        let latest = guard
            .iter()
            .filter(|(_, s)| s.status == SessionStatus::Paused)
            .max_by_key(|(id, s)| (s.paused_at, **id));
        let Some((id, session)) = latest else {
            return Ok(None);
        };
        let raw = session
            .snapshot_json
            .as_deref()
            .ok_or_else(|| StorageError::Serialization("paused session without snapshot".into()))?;
        Ok(Some(PendingSession {
            id: *id,
            snapshot: decode_snapshot(raw)?,
            paused_at: session.paused_at.unwrap_or(session.started_at),
        }))
    }

    async fn mark_resumed(&self, id: SessionId) -> Result<(), StorageError> {
        let mut guard = self.sessions()?;
        let session = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        if session.status == SessionStatus::Paused {
            session.status = SessionStatus::Active;
        }
        Ok(())
    }

    async fn record_final(
        &self,
        id: SessionId,
        report: &SessionReport,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.sessions()?;
        let session = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        session.status = SessionStatus::Completed;
        session.completed_at = Some(completed_at);
        session.total_correct = report.total_correct;
        session.total_errors = report.total_errors;
        session.rounds = report.rounds;
        session.snapshot_json = None;
        session.verb_errors.clone_from(&report.verb_errors);
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<SessionRecordRow, StorageError> {
        let guard = self.sessions()?;
        let session = guard.get(&id).ok_or(StorageError::NotFound)?;
        Ok(SessionRecordRow {
            id,
            status: session.status,
            started_at: session.started_at,
            paused_at: session.paused_at,
            completed_at: session.completed_at,
            total_correct: session.total_correct,
            total_errors: session.total_errors,
            rounds: session.rounds,
            snapshot: session
                .snapshot_json
                .as_deref()
                .map(decode_snapshot)
                .transpose()?,
            verb_errors: session.verb_errors.clone(),
        })
    }
}

/// Aggregates the catalog and the recorder behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub verbs: Arc<dyn VerbRepository>,
    pub sessions: Arc<dyn SessionRecorder>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let verbs: Arc<dyn VerbRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn SessionRecorder> = Arc::new(repo);
        Self { verbs, sessions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use verbs_core::time::fixed_now;

    fn snapshot(session_id: SessionId) -> PauseSnapshot {
        PauseSnapshot {
            session_id: Some(session_id),
            round_number: 1,
            global_correct: 1,
            global_total: 2,
            error_tally: BTreeMap::from([(VerbId::new(2), 1)]),
            pool: vec![VerbId::new(1), VerbId::new(2), VerbId::new(3)],
            retry: vec![VerbId::new(2)],
            current_index: 2,
            round_correct: 1,
            mode: verbs_core::model::QuizMode::Random,
        }
    }

    #[tokio::test]
    async fn insert_verbs_assigns_sequential_ids_and_sorts() {
        let repo = InMemoryRepository::new();
        let ids = repo
            .insert_verbs(&[
                NewVerbRecord::new("go", "went", "gone", "aller"),
                NewVerbRecord::new("be", "was / were", "been", "être"),
            ])
            .await
            .unwrap();
        assert_eq!(ids, vec![VerbId::new(1), VerbId::new(2)]);

        let verbs = repo.list_verbs().await.unwrap();
        assert_eq!(verbs[0].infinitive(), "be");
        assert_eq!(verbs[1].infinitive(), "go");
    }

    #[tokio::test]
    async fn rejected_batch_inserts_nothing() {
        let repo = InMemoryRepository::new();
        let err = repo
            .insert_verbs(&[
                NewVerbRecord::new("go", "went", "gone", "aller"),
                NewVerbRecord::new("", "saw", "seen", "voir"),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
        assert!(repo.list_verbs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pause_of_completed_session_keeps_other_pending() {
        let repo = InMemoryRepository::new();
        let paused = repo.create_session(fixed_now()).await.unwrap();
        let finished = repo.create_session(fixed_now()).await.unwrap();
        repo.save_pause(paused, &PauseRecord::from_snapshot(snapshot(paused)), fixed_now())
            .await
            .unwrap();
        let report = SessionReport::new(1, 3, 3, &BTreeMap::new());
        repo.record_final(finished, &report, fixed_now()).await.unwrap();

        let err = repo
            .save_pause(
                finished,
                &PauseRecord::from_snapshot(snapshot(finished)),
                fixed_now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        let row = repo.get_session(paused).await.unwrap();
        assert_eq!(row.status, SessionStatus::Paused);
        let pending = repo.pending_session().await.unwrap().expect("pending");
        assert_eq!(pending.id, paused);
    }

    #[tokio::test]
    async fn pause_makes_session_pending_until_resumed() {
        let repo = InMemoryRepository::new();
        let id = repo.create_session(fixed_now()).await.unwrap();
        assert!(repo.pending_session().await.unwrap().is_none());

        let record = PauseRecord::from_snapshot(snapshot(id));
        repo.save_pause(id, &record, fixed_now()).await.unwrap();

        let pending = repo.pending_session().await.unwrap().expect("pending");
        assert_eq!(pending.id, id);
        assert_eq!(pending.snapshot, snapshot(id));

        repo.mark_resumed(id).await.unwrap();
        assert!(repo.pending_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn only_latest_pause_is_pending() {
        let repo = InMemoryRepository::new();
        let first = repo.create_session(fixed_now()).await.unwrap();
        let second = repo.create_session(fixed_now()).await.unwrap();
        repo.save_pause(first, &PauseRecord::from_snapshot(snapshot(first)), fixed_now())
            .await
            .unwrap();
        repo.save_pause(second, &PauseRecord::from_snapshot(snapshot(second)), fixed_now())
            .await
            .unwrap();

        let pending = repo.pending_session().await.unwrap().unwrap();
        assert_eq!(pending.id, second);
        let first_row = repo.get_session(first).await.unwrap();
        assert_eq!(first_row.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn record_final_completes_session() {
        let repo = InMemoryRepository::new();
        let id = repo.create_session(fixed_now()).await.unwrap();
        let tally = BTreeMap::from([(VerbId::new(7), 2)]);
        let report = SessionReport::new(3, 5, 7, &tally);
        repo.record_final(id, &report, fixed_now()).await.unwrap();

        let row = repo.get_session(id).await.unwrap();
        assert_eq!(row.status, SessionStatus::Completed);
        assert_eq!(row.rounds, 3);
        assert_eq!(row.total_errors, 2);
        assert_eq!(row.verb_errors, report.verb_errors);
        assert!(row.snapshot.is_none());
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.mark_resumed(SessionId::new(99)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
