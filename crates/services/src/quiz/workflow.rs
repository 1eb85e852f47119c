use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use storage::repository::{PendingSession, SessionRecorder, Storage, VerbRepository};
use verbs_core::model::{PauseRecord, QuizSettings, SessionReport};

use super::round::{AnswerOutcome, FieldAnswers};
use super::session::{QuizSession, RoundTransition};
use crate::Clock;
use crate::error::SessionError;

/// Result of closing a round through the loop service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoundOutcome {
    NextRound { round_number: u32, retry_count: usize },
    /// `recorded` is false when the report could not be delivered.
    Victory { report: SessionReport, recorded: bool },
}

/// Orchestrates quiz sessions against the verb catalog and the session recorder.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    verbs: Arc<dyn VerbRepository>,
    sessions: Arc<dyn SessionRecorder>,
    settings: QuizSettings,
    seed: Option<u64>,
    in_flight: Arc<AtomicBool>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        verbs: Arc<dyn VerbRepository>,
        sessions: Arc<dyn SessionRecorder>,
    ) -> Self {
        Self {
            clock,
            verbs,
            sessions,
            settings: QuizSettings::default(),
            seed: None,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(clock, Arc::clone(&storage.verbs), Arc::clone(&storage.sessions))
    }

    #[must_use]
    pub fn with_settings(mut self, settings: QuizSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Seed the random source of every session this service builds.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn settings(&self) -> QuizSettings {
        self.settings
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Start a new session over the whole catalog.
    ///
    /// A recorder that cannot hand out an id does not stop play; the session then
    /// runs unrecorded and cannot be paused.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Catalog` if the verbs cannot be loaded and
    /// `SessionError::Empty` if there are none.
    pub async fn start(&self) -> Result<QuizSession, SessionError> {
        let _guard = InFlight::acquire(&self.in_flight)?;

        let catalog = self.verbs.list_verbs().await.map_err(SessionError::Catalog)?;
        if catalog.is_empty() {
            return Err(SessionError::Empty);
        }

        let session_id = match self.sessions.create_session(self.clock.now()).await {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(error = %err, "session recorder unavailable, playing unrecorded");
                None
            }
        };

        let session = QuizSession::new(catalog, self.settings, session_id, self.rng())?;
        info!(
            session_id = ?session.session_id(),
            mode = %self.settings.mode(),
            verbs = session.progress().round_total,
            "quiz session started"
        );
        Ok(session)
    }

    /// # Errors
    ///
    /// See [`QuizSession::submit`].
    pub fn submit(
        &self,
        session: &mut QuizSession,
        answers: &FieldAnswers,
    ) -> Result<AnswerOutcome, SessionError> {
        session.submit(answers)
    }

    /// # Errors
    ///
    /// See [`QuizSession::advance`].
    pub fn advance(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        session.advance()
    }

    /// Close the finished round and deliver the final report on victory.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RoundInProgress` while verbs remain, or `Busy` if another
    /// lifecycle call is running. Recorder failures are logged, not returned.
    pub async fn on_round_complete(
        &self,
        session: &mut QuizSession,
    ) -> Result<RoundOutcome, SessionError> {
        let _guard = InFlight::acquire(&self.in_flight)?;

        let report = match session.on_round_complete()? {
            RoundTransition::NextRound {
                round_number,
                retry_count,
            } => {
                return Ok(RoundOutcome::NextRound {
                    round_number,
                    retry_count,
                });
            }
            RoundTransition::Victory(report) => report,
        };

        let recorded = match session.session_id() {
            Some(id) => match self
                .sessions
                .record_final(id, &report, self.clock.now())
                .await
            {
                Ok(()) => true,
                Err(err) => {
                    warn!(session_id = %id, error = %err, "failed to record final report");
                    false
                }
            },
            None => {
                debug!("unrecorded session finished, report kept local");
                false
            }
        };

        info!(
            session_id = ?session.session_id(),
            rounds = report.rounds,
            accuracy = report.accuracy_percent,
            recorded,
            "quiz session finished"
        );
        Ok(RoundOutcome::Victory { report, recorded })
    }

    /// Hand the session state to the recorder and mark the session paused.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotRecorded` for a session without id and
    /// `SessionError::Recorder` if the snapshot could not be stored; the session is
    /// then still active.
    pub async fn pause(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        let _guard = InFlight::acquire(&self.in_flight)?;

        session.ensure_active()?;
        let Some(id) = session.session_id() else {
            return Err(SessionError::NotRecorded);
        };

        let record = PauseRecord::from_snapshot(session.snapshot());
        self.sessions
            .save_pause(id, &record, self.clock.now())
            .await
            .map_err(|err| {
                warn!(session_id = %id, error = %err, "failed to pause session");
                SessionError::Recorder(err)
            })?;

        session.mark_paused();
        info!(session_id = %id, round = record.rounds, "quiz session paused");
        Ok(())
    }

    /// Pending paused session, if any.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Recorder` on recorder failure.
    pub async fn pending(&self) -> Result<Option<PendingSession>, SessionError> {
        self.sessions
            .pending_session()
            .await
            .map_err(SessionError::Recorder)
    }

    /// Rebuild the pending paused session against the current catalog.
    ///
    /// The session is only handed out once the recorder has taken it off the pending
    /// slot; otherwise the snapshot stays pending for a later attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoPendingSession` if nothing is paused,
    /// `SessionError::Recorder` / `SessionError::Catalog` on storage failures.
    pub async fn resume(&self) -> Result<QuizSession, SessionError> {
        let _guard = InFlight::acquire(&self.in_flight)?;

        let pending = self
            .sessions
            .pending_session()
            .await
            .map_err(SessionError::Recorder)?
            .ok_or(SessionError::NoPendingSession)?;
        let catalog = self.verbs.list_verbs().await.map_err(SessionError::Catalog)?;

        let mut session = QuizSession::from_snapshot(pending.snapshot, &catalog, self.rng())?;
        session.set_session_id(Some(pending.id));

        self.sessions
            .mark_resumed(pending.id)
            .await
            .map_err(|err| {
                warn!(session_id = %pending.id, error = %err, "failed to mark session resumed");
                SessionError::Recorder(err)
            })?;

        info!(
            session_id = %pending.id,
            round = session.round_number(),
            index = session.progress().current_index,
            "quiz session resumed"
        );
        Ok(session)
    }
}

/// Single-flight guard for lifecycle calls, released on drop.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, SessionError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| SessionError::Busy)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
