use serde::{Deserialize, Serialize};

use crate::model::ids::VerbId;
use crate::model::verb::Verb;

//
// ─── FIELDS ────────────────────────────────────────────────────────────────────
//

/// A verb form the user is asked to type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    Infinitive,
    PastSimple,
    PastParticiple,
}

impl FieldKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::Infinitive => "infinitive",
            FieldKey::PastSimple => "past_simple",
            FieldKey::PastParticiple => "past_participle",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            FieldKey::Infinitive => "Infinitif",
            FieldKey::PastSimple => "Prétérit",
            FieldKey::PastParticiple => "Participe passé",
        }
    }

    fn expected_from(self, verb: &Verb) -> &str {
        match self {
            FieldKey::Infinitive => verb.infinitive(),
            FieldKey::PastSimple => verb.past_simple(),
            FieldKey::PastParticiple => verb.past_participle(),
        }
    }
}

/// One input of a question. `expected` may hold `/`-separated alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub key: FieldKey,
    pub label: &'static str,
    pub expected: String,
}

impl FieldSpec {
    fn for_verb(key: FieldKey, verb: &Verb) -> Self {
        Self {
            key,
            label: key.label(),
            expected: key.expected_from(verb).to_string(),
        }
    }
}

//
// ─── ARCHETYPES ────────────────────────────────────────────────────────────────
//

/// Shape of a question: which form is shown and which forms are asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    FrenchToAll,
    InfinitiveToPast,
    PastToOthers,
    ParticipleToOthers,
}

impl Archetype {
    pub const ALL: [Archetype; 4] = [
        Archetype::FrenchToAll,
        Archetype::InfinitiveToPast,
        Archetype::PastToOthers,
        Archetype::ParticipleToOthers,
    ];

    /// Fields to elicit, in the order the renderer must present them.
    #[must_use]
    pub fn fields(self) -> &'static [FieldKey] {
        match self {
            Archetype::FrenchToAll => &[
                FieldKey::Infinitive,
                FieldKey::PastSimple,
                FieldKey::PastParticiple,
            ],
            Archetype::InfinitiveToPast => &[FieldKey::PastSimple, FieldKey::PastParticiple],
            Archetype::PastToOthers => &[FieldKey::Infinitive, FieldKey::PastParticiple],
            Archetype::ParticipleToOthers => &[FieldKey::Infinitive, FieldKey::PastSimple],
        }
    }

    /// Build the question of this shape for `verb`.
    #[must_use]
    pub fn for_verb(self, verb: &Verb) -> Question {
        let (prompt_label, prompt_value, hint) = match self {
            Archetype::FrenchToAll => ("Français", verb.french(), ""),
            Archetype::InfinitiveToPast => (
                FieldKey::Infinitive.label(),
                verb.infinitive(),
                verb.french(),
            ),
            Archetype::PastToOthers => (
                FieldKey::PastSimple.label(),
                verb.past_simple(),
                verb.french(),
            ),
            Archetype::ParticipleToOthers => (
                FieldKey::PastParticiple.label(),
                verb.past_participle(),
                verb.french(),
            ),
        };

        Question {
            verb_id: verb.id(),
            archetype: self,
            prompt_label,
            prompt_value: prompt_value.to_string(),
            hint: hint.to_string(),
            fields: self
                .fields()
                .iter()
                .map(|key| FieldSpec::for_verb(*key, verb))
                .collect(),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A question generated for a single presentation of a verb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub verb_id: VerbId,
    pub archetype: Archetype,
    pub prompt_label: &'static str,
    pub prompt_value: String,
    pub hint: String,
    pub fields: Vec<FieldSpec>,
}

impl Question {
    #[must_use]
    pub fn field(&self, key: FieldKey) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }
}
