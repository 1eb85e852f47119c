use serde::Serialize;
use thiserror::Error;

use crate::model::ids::VerbId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VerbError {
    #[error("verb {field} cannot be empty")]
    EmptyField { field: &'static str },
}

/// An irregular verb as stored in the catalog.
///
/// Text fields are trimmed on construction. `past_simple` and `past_participle`
/// may list accepted alternatives separated by `/` (for example `"was / were"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verb {
    id: VerbId,
    infinitive: String,
    past_simple: String,
    past_participle: String,
    french: String,
}

impl Verb {
    /// Build a verb record.
    ///
    /// # Errors
    ///
    /// Returns `VerbError::EmptyField` if any text field is blank.
    pub fn new(
        id: VerbId,
        infinitive: impl Into<String>,
        past_simple: impl Into<String>,
        past_participle: impl Into<String>,
        french: impl Into<String>,
    ) -> Result<Self, VerbError> {
        Ok(Self {
            id,
            infinitive: required("infinitive", infinitive.into())?,
            past_simple: required("past_simple", past_simple.into())?,
            past_participle: required("past_participle", past_participle.into())?,
            french: required("french", french.into())?,
        })
    }

    #[must_use]
    pub fn id(&self) -> VerbId {
        self.id
    }

    #[must_use]
    pub fn infinitive(&self) -> &str {
        &self.infinitive
    }

    #[must_use]
    pub fn past_simple(&self) -> &str {
        &self.past_simple
    }

    #[must_use]
    pub fn past_participle(&self) -> &str {
        &self.past_participle
    }

    #[must_use]
    pub fn french(&self) -> &str {
        &self.french
    }
}

fn required(field: &'static str, value: String) -> Result<String, VerbError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(VerbError::EmptyField { field });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_trims_fields() {
        let verb = Verb::new(VerbId::new(1), " go ", "went", "gone ", "aller").unwrap();
        assert_eq!(verb.infinitive(), "go");
        assert_eq!(verb.past_participle(), "gone");
    }

    #[test]
    fn verb_rejects_blank_translation() {
        let err = Verb::new(VerbId::new(1), "go", "went", "gone", "  ").unwrap_err();
        assert_eq!(err, VerbError::EmptyField { field: "french" });
    }
}
