use std::collections::{BTreeMap, HashMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use verbs_core::QuestionGenerator;
use verbs_core::model::{
    PauseSnapshot, Question, QuizMode, QuizSettings, SessionId, SessionReport, Verb, VerbId,
    accuracy_percent,
};

use super::progress::QuizProgress;
use super::round::{AnswerOutcome, FieldAnswers, RoundEngine};
use crate::error::SessionError;

//
// ─── STATUS & TRANSITIONS ──────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizStatus {
    Active,
    Paused,
    Finished,
}

/// What happened when a completed round was closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundTransition {
    /// Missed verbs start a new round.
    NextRound { round_number: u32, retry_count: usize },
    /// Nothing left to retry; the session is finished.
    Victory(SessionReport),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One quiz run: rounds repeat over missed verbs until a round has no misses.
///
/// Owns its random source so question archetypes and round order stay reproducible
/// when the caller seeds it.
#[derive(Debug, Clone)]
pub struct QuizSession {
    session_id: Option<SessionId>,
    settings: QuizSettings,
    generator: QuestionGenerator,
    rng: StdRng,
    engine: RoundEngine,
    question: Option<Question>,
    round_number: u32,
    global_correct: u32,
    global_total: u32,
    error_tally: BTreeMap<VerbId, u32>,
    status: QuizStatus,
}

impl QuizSession {
    /// Start a session over `catalog`, capped to `settings.count()` random verbs.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the catalog has no verbs.
    pub fn new(
        mut catalog: Vec<Verb>,
        settings: QuizSettings,
        session_id: Option<SessionId>,
        mut rng: StdRng,
    ) -> Result<Self, SessionError> {
        catalog.shuffle(&mut rng);
        if let Some(count) = settings.count() {
            let count = usize::try_from(count).unwrap_or(usize::MAX);
            catalog.truncate(count);
        }

        if catalog.is_empty() {
            return Err(SessionError::Empty);
        }

        let mut engine = RoundEngine::new();
        engine.start_round(catalog, &mut rng);

        let mut session = Self {
            session_id,
            settings,
            generator: QuestionGenerator::new(settings.mode()),
            rng,
            engine,
            question: None,
            round_number: 1,
            global_correct: 0,
            global_total: 0,
            error_tally: BTreeMap::new(),
            status: QuizStatus::Active,
        };
        session.present();
        Ok(session)
    }

    /// Rebuild a paused session from its snapshot and the current catalog.
    ///
    /// Ids that no longer resolve are dropped; the cursor then counts only the
    /// surviving verbs that were already answered.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Snapshot` if the snapshot counters are inconsistent.
    pub fn from_snapshot(
        snapshot: PauseSnapshot,
        catalog: &[Verb],
        rng: StdRng,
    ) -> Result<Self, SessionError> {
        snapshot.validate()?;

        let by_id: HashMap<VerbId, &Verb> = catalog.iter().map(|v| (v.id(), v)).collect();
        let (pool, cursor) = resolve(&snapshot.pool, &by_id, snapshot.current_index);
        let (retry, _) = resolve(&snapshot.retry, &by_id, snapshot.retry.len());

        let answered_correctly = cursor.saturating_sub(retry.len());
        let round_correct = snapshot
            .round_correct
            .min(u32::try_from(answered_correctly).unwrap_or(u32::MAX));

        let mut engine = RoundEngine::new();
        engine.resume_round(pool, retry, cursor, round_correct)?;

        let settings = QuizSettings::default().with_mode(snapshot.mode);
        let mut session = Self {
            session_id: snapshot.session_id,
            settings,
            generator: QuestionGenerator::new(snapshot.mode),
            rng,
            engine,
            question: None,
            round_number: snapshot.round_number,
            global_correct: snapshot.global_correct,
            global_total: snapshot.global_total,
            error_tally: snapshot.error_tally,
            status: QuizStatus::Active,
        };
        session.present();
        Ok(session)
    }

    fn present(&mut self) {
        self.question = self
            .engine
            .current_verb()
            .map(|verb| self.generator.generate(verb, &mut self.rng));
    }

    pub(crate) fn ensure_active(&self) -> Result<(), SessionError> {
        match self.status {
            QuizStatus::Active => Ok(()),
            QuizStatus::Paused => Err(SessionError::Paused),
            QuizStatus::Finished => Err(SessionError::Completed),
        }
    }

    pub(crate) fn set_session_id(&mut self, session_id: Option<SessionId>) {
        self.session_id = session_id;
    }

    pub(crate) fn mark_paused(&mut self) {
        self.status = QuizStatus::Paused;
    }

    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    #[must_use]
    pub fn settings(&self) -> QuizSettings {
        self.settings
    }

    #[must_use]
    pub fn mode(&self) -> QuizMode {
        self.settings.mode()
    }

    #[must_use]
    pub fn status(&self) -> QuizStatus {
        self.status
    }

    #[must_use]
    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    #[must_use]
    pub fn global_correct(&self) -> u32 {
        self.global_correct
    }

    #[must_use]
    pub fn global_total(&self) -> u32 {
        self.global_total
    }

    #[must_use]
    pub fn error_tally(&self) -> &BTreeMap<VerbId, u32> {
        &self.error_tally
    }

    #[must_use]
    pub fn round(&self) -> &RoundEngine {
        &self.engine
    }

    /// The question for the verb being asked, stable until `advance`.
    #[must_use]
    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.engine.is_answered()
    }

    #[must_use]
    pub fn is_round_complete(&self) -> bool {
        self.engine.is_round_complete()
    }

    /// Session-wide accuracy, 100 before anything was answered.
    #[must_use]
    pub fn accuracy_percent(&self) -> u32 {
        accuracy_percent(self.global_correct, self.global_total)
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        QuizProgress {
            round_number: self.round_number,
            current_index: self.engine.current_index(),
            round_total: self.engine.round_total(),
            round_correct: self.engine.round_correct(),
            round_errors: self.engine.retry().len(),
            global_correct: self.global_correct,
            global_total: self.global_total,
            is_answered: self.engine.is_answered(),
            is_round_complete: self.engine.is_round_complete(),
        }
    }

    /// Submit answers for the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Paused` or `SessionError::Completed` for an inactive
    /// session, otherwise whatever the round rejects (`AlreadyAnswered`, `RoundComplete`).
    pub fn submit(&mut self, answers: &FieldAnswers) -> Result<AnswerOutcome, SessionError> {
        self.ensure_active()?;
        let Some(question) = self.question.as_ref() else {
            return Err(SessionError::RoundComplete);
        };

        let outcome = self.engine.submit(question, answers)?;
        self.global_total = self.global_total.saturating_add(1);
        if outcome.correct {
            self.global_correct = self.global_correct.saturating_add(1);
        } else {
            let errors = self.error_tally.entry(outcome.verb_id).or_insert(0);
            *errors = errors.saturating_add(1);
        }
        Ok(outcome)
    }

    /// Move to the next verb and generate its question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAnswered` before a submit, `SessionError::RoundComplete`
    /// after the last verb, and the inactive-session errors of `submit`.
    pub fn advance(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.engine.advance()?;
        self.present();
        Ok(())
    }

    /// Close a completed round: start the next one over the missed verbs, or finish.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RoundInProgress` while verbs remain in the round.
    pub fn on_round_complete(&mut self) -> Result<RoundTransition, SessionError> {
        self.ensure_active()?;
        if !self.engine.is_round_complete() {
            return Err(SessionError::RoundInProgress);
        }

        let retry = self.engine.retry().to_vec();
        if retry.is_empty() {
            self.status = QuizStatus::Finished;
            self.question = None;
            return Ok(RoundTransition::Victory(self.report()));
        }

        let retry_count = retry.len();
        self.round_number = self.round_number.saturating_add(1);
        self.engine.start_round(retry, &mut self.rng);
        self.present();
        debug!(
            round = self.round_number,
            retry_count, "starting retry round"
        );
        Ok(RoundTransition::NextRound {
            round_number: self.round_number,
            retry_count,
        })
    }

    #[must_use]
    pub fn report(&self) -> SessionReport {
        SessionReport::new(
            self.round_number,
            self.global_correct,
            self.global_total,
            &self.error_tally,
        )
    }

    /// Capture everything needed to continue later.
    ///
    /// An answered question that was not advanced past counts as done, so it is
    /// not asked again after a resume.
    #[must_use]
    pub fn snapshot(&self) -> PauseSnapshot {
        let current_index = self.engine.current_index() + usize::from(self.engine.is_answered());
        PauseSnapshot {
            session_id: self.session_id,
            round_number: self.round_number,
            global_correct: self.global_correct,
            global_total: self.global_total,
            error_tally: self.error_tally.clone(),
            pool: self.engine.pool().iter().map(Verb::id).collect(),
            retry: self.engine.retry().iter().map(Verb::id).collect(),
            current_index: current_index.min(self.engine.round_total()),
            round_correct: self.engine.round_correct(),
            mode: self.settings.mode(),
        }
    }
}

/// Resolve ids against the catalog, returning the verbs and how many of the first
/// `answered` ids survived.
fn resolve(
    ids: &[VerbId],
    by_id: &HashMap<VerbId, &Verb>,
    answered: usize,
) -> (Vec<Verb>, usize) {
    let mut seen = HashSet::with_capacity(ids.len());
    let mut verbs = Vec::with_capacity(ids.len());
    let mut cursor = 0;

    for (position, id) in ids.iter().enumerate() {
        if !seen.insert(*id) {
            continue;
        }
        let Some(verb) = by_id.get(id) else {
            debug!(verb_id = %id, "dropping verb missing from catalog");
            continue;
        };
        if position < answered {
            cursor += 1;
        }
        verbs.push((*verb).clone());
    }

    (verbs, cursor)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn verb(id: u64, inf: &str, past: &str, pp: &str) -> Verb {
        Verb::new(VerbId::new(id), inf, past, pp, "fr").unwrap()
    }

    fn catalog() -> Vec<Verb> {
        vec![
            verb(1, "go", "went", "gone"),
            verb(2, "see", "saw", "seen"),
            verb(3, "take", "took", "taken"),
            verb(4, "eat", "ate", "eaten"),
            verb(7, "be", "was / were", "been"),
        ]
    }

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    fn start(verbs: Vec<Verb>) -> QuizSession {
        QuizSession::new(verbs, QuizSettings::default(), Some(SessionId::new(1)), rng(42))
            .unwrap()
    }

    fn correct_answers(session: &QuizSession) -> FieldAnswers {
        session
            .question()
            .unwrap()
            .fields
            .iter()
            .map(|f| (f.key, f.expected.split('/').next().unwrap().trim().to_string()))
            .collect()
    }

    fn answer(session: &mut QuizSession, right: bool) -> AnswerOutcome {
        let answers = if right {
            correct_answers(session)
        } else {
            FieldAnswers::new()
        };
        session.submit(&answers).unwrap()
    }

    fn current_id(session: &QuizSession) -> VerbId {
        session.question().unwrap().verb_id
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let result = QuizSession::new(Vec::new(), QuizSettings::default(), None, rng(1));
        assert!(matches!(result, Err(SessionError::Empty)));
    }

    #[test]
    fn count_caps_the_first_round() {
        let settings = QuizSettings::new(QuizMode::Complete, Some(2)).unwrap();
        let session = QuizSession::new(catalog(), settings, None, rng(3)).unwrap();
        assert_eq!(session.progress().round_total, 2);
        assert_eq!(session.round_number(), 1);
    }

    #[test]
    fn question_is_stable_until_advance() {
        let session = start(catalog());
        let first = session.question().cloned();
        assert_eq!(session.question().cloned(), first);
    }

    #[test]
    fn single_correct_verb_wins_after_one_round() {
        let mut session = start(vec![verb(1, "go", "went", "gone")]);
        assert!(answer(&mut session, true).correct);
        session.advance().unwrap();

        let RoundTransition::Victory(report) = session.on_round_complete().unwrap() else {
            panic!("expected victory");
        };
        assert_eq!(report.rounds, 1);
        assert_eq!(report.accuracy_percent, 100);
        assert_eq!(report.total_errors, 0);
        assert_eq!(session.status(), QuizStatus::Finished);
        assert!(session.question().is_none());
    }

    #[test]
    fn missed_verb_is_the_only_one_retried() {
        let a = verb(1, "go", "went", "gone");
        let b = verb(2, "see", "saw", "seen");
        let mut session = start(vec![a.clone(), b]);

        while !session.is_round_complete() {
            let miss = current_id(&session) == a.id();
            answer(&mut session, !miss);
            session.advance().unwrap();
        }

        let transition = session.on_round_complete().unwrap();
        assert_eq!(
            transition,
            RoundTransition::NextRound {
                round_number: 2,
                retry_count: 1
            }
        );
        let pool: Vec<_> = session.round().pool().iter().map(Verb::id).collect();
        assert_eq!(pool, vec![a.id()]);
        assert_eq!(session.progress().current_index, 0);
    }

    #[test]
    fn tally_counts_each_miss() {
        let mut session = start(vec![verb(7, "be", "was / were", "been")]);
        for _ in 0..2 {
            assert!(!answer(&mut session, false).correct);
            session.advance().unwrap();
            session.on_round_complete().unwrap();
        }
        answer(&mut session, true);
        session.advance().unwrap();

        let RoundTransition::Victory(report) = session.on_round_complete().unwrap() else {
            panic!("expected victory");
        };
        assert_eq!(session.error_tally().get(&VerbId::new(7)), Some(&2));
        assert_eq!(report.rounds, 3);
        assert_eq!(report.total_answered, 3);
        assert_eq!(report.accuracy_percent, 33);
    }

    #[test]
    fn accuracy_before_any_answer_is_full() {
        let session = start(catalog());
        assert_eq!(session.accuracy_percent(), 100);
    }

    #[test]
    fn round_score_and_retry_cover_the_round() {
        let mut session = start(catalog());
        let mut right = true;
        while !session.is_round_complete() {
            answer(&mut session, right);
            session.advance().unwrap();
            right = !right;
        }
        let progress = session.progress();
        assert_eq!(
            progress.round_correct as usize + progress.round_errors,
            progress.round_total
        );
        assert_eq!(progress.global_total, 5);
    }

    #[test]
    fn round_cannot_close_early() {
        let mut session = start(catalog());
        assert!(matches!(
            session.on_round_complete(),
            Err(SessionError::RoundInProgress)
        ));
    }

    #[test]
    fn pause_and_resume_continues_where_it_stopped() {
        let mut session = start(catalog());
        answer(&mut session, false);
        session.advance().unwrap();
        answer(&mut session, true);
        session.advance().unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.current_index, 2);

        let json = snapshot.to_json().unwrap();
        let restored =
            QuizSession::from_snapshot(PauseSnapshot::from_json(&json).unwrap(), &catalog(), rng(9))
                .unwrap();

        assert_eq!(restored.progress().current_index, 2);
        assert_eq!(restored.round_number(), session.round_number());
        assert_eq!(restored.error_tally(), session.error_tally());
        assert_eq!(restored.round().retry(), session.round().retry());
        assert_eq!(restored.round().pool(), session.round().pool());
        assert_eq!(current_id(&restored), current_id(&session));
        assert_eq!(restored.global_total(), 2);
    }

    #[test]
    fn snapshot_after_submit_skips_the_answered_verb() {
        let mut session = start(catalog());
        answer(&mut session, true);
        let answered = current_id(&session);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.current_index, 1);

        let restored = QuizSession::from_snapshot(snapshot, &catalog(), rng(5)).unwrap();
        assert_ne!(current_id(&restored), answered);
        assert_eq!(restored.progress().round_correct, 1);
    }

    #[test]
    fn resume_drops_unknown_verbs_and_rebases_cursor() {
        let snapshot = PauseSnapshot {
            session_id: Some(SessionId::new(12)),
            round_number: 2,
            global_correct: 40,
            global_total: 55,
            error_tally: BTreeMap::from([(VerbId::new(7), 2), (VerbId::new(99), 1)]),
            pool: vec![VerbId::new(99), VerbId::new(7), VerbId::new(2)],
            retry: vec![VerbId::new(99), VerbId::new(7)],
            current_index: 2,
            round_correct: 0,
            mode: QuizMode::Preterit,
        };

        let session = QuizSession::from_snapshot(snapshot, &catalog(), rng(1)).unwrap();
        let progress = session.progress();
        assert_eq!(progress.round_total, 2);
        assert_eq!(progress.current_index, 1);
        assert_eq!(progress.round_errors, 1);
        assert_eq!(current_id(&session), VerbId::new(2));
        assert_eq!(session.mode(), QuizMode::Preterit);
        assert_eq!(session.error_tally().get(&VerbId::new(99)), Some(&1));
    }

    #[test]
    fn resume_of_completed_round_closes_normally() {
        let snapshot = PauseSnapshot {
            session_id: None,
            round_number: 1,
            global_correct: 2,
            global_total: 2,
            error_tally: BTreeMap::new(),
            pool: vec![VerbId::new(1), VerbId::new(2)],
            retry: Vec::new(),
            current_index: 2,
            round_correct: 2,
            mode: QuizMode::Random,
        };
        let mut session = QuizSession::from_snapshot(snapshot, &catalog(), rng(2)).unwrap();
        assert!(session.is_round_complete());
        assert!(matches!(
            session.on_round_complete().unwrap(),
            RoundTransition::Victory(_)
        ));
    }

    #[test]
    fn finished_or_paused_session_rejects_play() {
        let mut session = start(vec![verb(1, "go", "went", "gone")]);
        answer(&mut session, true);
        session.advance().unwrap();
        session.on_round_complete().unwrap();

        assert!(matches!(
            session.submit(&FieldAnswers::new()),
            Err(SessionError::Completed)
        ));

        let mut paused = start(catalog());
        paused.mark_paused();
        assert!(matches!(paused.advance(), Err(SessionError::Paused)));
    }
}
