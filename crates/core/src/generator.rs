use rand::Rng;
use rand::seq::IndexedRandom;

use crate::model::{Archetype, Question, QuizMode, Verb};

/// Produces a fresh question each time a verb is presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuestionGenerator {
    mode: QuizMode,
}

impl QuestionGenerator {
    #[must_use]
    pub fn new(mode: QuizMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub fn mode(&self) -> QuizMode {
        self.mode
    }

    /// Pick the archetype for the next question.
    pub fn pick_archetype<R: Rng + ?Sized>(&self, rng: &mut R) -> Archetype {
        match self.mode {
            QuizMode::Complete => Archetype::FrenchToAll,
            QuizMode::Preterit => Archetype::InfinitiveToPast,
            QuizMode::Random => *Archetype::ALL
                .choose(rng)
                .unwrap_or(&Archetype::FrenchToAll),
        }
    }

    pub fn generate<R: Rng + ?Sized>(&self, verb: &Verb, rng: &mut R) -> Question {
        self.pick_archetype(rng).for_verb(verb)
    }
}
