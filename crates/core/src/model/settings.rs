use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("unknown quiz mode: {raw} (expected random, complete or preterit)")]
    UnknownMode { raw: String },

    #[error("verb count must be > 0 (omit it to use the whole catalog)")]
    InvalidCount,
}

/// How question archetypes are picked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizMode {
    /// Any of the four archetypes, drawn uniformly for every question.
    #[default]
    Random,
    /// Always ask every form from the translation.
    Complete,
    /// Always ask past simple and past participle from the infinitive.
    Preterit,
}

impl QuizMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuizMode::Random => "random",
            QuizMode::Complete => "complete",
            QuizMode::Preterit => "preterit",
        }
    }
}

impl fmt::Display for QuizMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuizMode {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(QuizMode::Random),
            "complete" => Ok(QuizMode::Complete),
            "preterit" => Ok(QuizMode::Preterit),
            _ => Err(SettingsError::UnknownMode { raw: s.to_string() }),
        }
    }
}

/// Options chosen when a quiz starts.
///
/// Defaults: random mode, whole catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuizSettings {
    mode: QuizMode,
    count: Option<u32>,
}

impl QuizSettings {
    /// Creates settings with an optional cap on the initial pool size.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidCount` for `Some(0)`.
    pub fn new(mode: QuizMode, count: Option<u32>) -> Result<Self, SettingsError> {
        if count == Some(0) {
            return Err(SettingsError::InvalidCount);
        }
        Ok(Self { mode, count })
    }

    #[must_use]
    pub fn with_mode(mut self, mode: QuizMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn mode(&self) -> QuizMode {
        self.mode
    }

    /// Maximum number of verbs in the first round, `None` for the whole catalog.
    #[must_use]
    pub fn count(&self) -> Option<u32> {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Preterit".parse::<QuizMode>().unwrap(), QuizMode::Preterit);
        assert_eq!(" complete ".parse::<QuizMode>().unwrap(), QuizMode::Complete);
        assert!(matches!(
            "everything".parse::<QuizMode>(),
            Err(SettingsError::UnknownMode { .. })
        ));
    }

    #[test]
    fn defaults_are_random_over_whole_catalog() {
        let settings = QuizSettings::default();
        assert_eq!(settings.mode(), QuizMode::Random);
        assert_eq!(settings.count(), None);
    }

    #[test]
    fn zero_count_is_rejected() {
        assert_eq!(
            QuizSettings::new(QuizMode::Random, Some(0)).unwrap_err(),
            SettingsError::InvalidCount
        );
        assert_eq!(
            QuizSettings::new(QuizMode::Complete, Some(20)).unwrap().count(),
            Some(20)
        );
    }

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&QuizMode::Preterit).unwrap(), "\"preterit\"");
    }
}
