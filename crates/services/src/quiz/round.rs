use std::collections::{HashMap, HashSet};

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use verbs_core::answer;
use verbs_core::model::{FieldKey, Question, Verb, VerbId};

use crate::error::SessionError;

/// Raw user input per field of the current question.
pub type FieldAnswers = HashMap<FieldKey, String>;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Result of checking one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldResult {
    pub key: FieldKey,
    pub given: String,
    pub expected: String,
    pub correct: bool,
}

/// Result of submitting answers for the current verb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerOutcome {
    pub verb_id: VerbId,
    /// True only when every field is correct.
    pub correct: bool,
    pub fields: Vec<FieldResult>,
}

impl AnswerOutcome {
    fn evaluate(question: &Question, answers: &FieldAnswers) -> Self {
        let fields: Vec<_> = question
            .fields
            .iter()
            .map(|field| {
                let given = answers.get(&field.key).cloned().unwrap_or_default();
                let correct = answer::check(&given, &field.expected);
                FieldResult {
                    key: field.key,
                    given,
                    expected: field.expected.clone(),
                    correct,
                }
            })
            .collect();

        Self {
            verb_id: question.verb_id,
            correct: !fields.is_empty() && fields.iter().all(|f| f.correct),
            fields,
        }
    }
}

//
// ─── ROUND ENGINE ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    InRound,
    RoundComplete,
}

/// Steps through one round: every verb of the pool once, misses go to `retry`.
#[derive(Debug, Clone)]
pub struct RoundEngine {
    phase: RoundPhase,
    pool: Vec<Verb>,
    retry: Vec<Verb>,
    current: usize,
    round_correct: u32,
    answered: bool,
}

impl Default for RoundEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: RoundPhase::Idle,
            pool: Vec::new(),
            retry: Vec::new(),
            current: 0,
            round_correct: 0,
            answered: false,
        }
    }

    /// Start a round over `pool` in a fresh uniform random order.
    ///
    /// Duplicate ids keep their first occurrence. An empty pool completes at once.
    pub fn start_round<R: Rng + ?Sized>(&mut self, pool: Vec<Verb>, rng: &mut R) {
        let mut pool = dedupe(pool);
        pool.shuffle(rng);
        self.install(pool, Vec::new(), 0, 0);
    }

    /// Rebuild a round that was interrupted after `current_index` answers.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RoundComplete` if the cursor is past the pool.
    pub fn resume_round(
        &mut self,
        pool: Vec<Verb>,
        retry: Vec<Verb>,
        current_index: usize,
        round_correct: u32,
    ) -> Result<(), SessionError> {
        let pool = dedupe(pool);
        if current_index > pool.len() {
            return Err(SessionError::RoundComplete);
        }
        self.install(pool, dedupe(retry), current_index, round_correct);
        Ok(())
    }

    fn install(&mut self, pool: Vec<Verb>, retry: Vec<Verb>, current: usize, round_correct: u32) {
        self.phase = if current >= pool.len() {
            RoundPhase::RoundComplete
        } else {
            RoundPhase::InRound
        };
        self.pool = pool;
        self.retry = retry;
        self.current = current;
        self.round_correct = round_correct;
        self.answered = false;
    }

    #[must_use]
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    #[must_use]
    pub fn is_round_complete(&self) -> bool {
        self.phase == RoundPhase::RoundComplete
    }

    /// True once the current question has been submitted and not yet advanced past.
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.answered
    }

    #[must_use]
    pub fn current_verb(&self) -> Option<&Verb> {
        if self.phase == RoundPhase::InRound {
            self.pool.get(self.current)
        } else {
            None
        }
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn pool(&self) -> &[Verb] {
        &self.pool
    }

    #[must_use]
    pub fn retry(&self) -> &[Verb] {
        &self.retry
    }

    #[must_use]
    pub fn round_correct(&self) -> u32 {
        self.round_correct
    }

    #[must_use]
    pub fn round_total(&self) -> usize {
        self.pool.len()
    }

    /// Check the answers for the current verb and classify it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RoundComplete` when no verb is being asked,
    /// `SessionError::AlreadyAnswered` on a second submission, and
    /// `SessionError::QuestionMismatch` when `question` belongs to another verb.
    pub fn submit(
        &mut self,
        question: &Question,
        answers: &FieldAnswers,
    ) -> Result<AnswerOutcome, SessionError> {
        let Some(verb) = self.current_verb() else {
            return Err(SessionError::RoundComplete);
        };
        if self.answered {
            return Err(SessionError::AlreadyAnswered);
        }
        if question.verb_id != verb.id() {
            return Err(SessionError::QuestionMismatch {
                expected: verb.id(),
                got: question.verb_id,
            });
        }

        let outcome = AnswerOutcome::evaluate(question, answers);
        if outcome.correct {
            self.round_correct = self.round_correct.saturating_add(1);
        } else {
            let missed = verb.clone();
            self.retry.push(missed);
        }
        self.answered = true;
        Ok(outcome)
    }

    /// Move past the answered verb. Completes the round after the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RoundComplete` outside a round and
    /// `SessionError::NotAnswered` if the current verb was not submitted.
    pub fn advance(&mut self) -> Result<(), SessionError> {
        if self.phase != RoundPhase::InRound {
            return Err(SessionError::RoundComplete);
        }
        if !self.answered {
            return Err(SessionError::NotAnswered);
        }
        self.current += 1;
        self.answered = false;
        if self.current >= self.pool.len() {
            self.phase = RoundPhase::RoundComplete;
        }
        Ok(())
    }
}

fn dedupe(verbs: Vec<Verb>) -> Vec<Verb> {
    let mut seen = HashSet::with_capacity(verbs.len());
    verbs.into_iter().filter(|v| seen.insert(v.id())).collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
