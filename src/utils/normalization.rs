//! Observation Normalization
//!
//! Converts raw questionnaire answers (or image-derived answers using the same
//! field names) into the section-grouped shape sent to the reasoning service.
//!
//! Output shape:
//! ```json
//! {
//!   "general":  { "landSize": "small", "landUse": "other", "landUse_custom": "allotment" },
//!   "wildlife": { "wildlifeFeatures": ["birdhouses", "log_piles"] }
//! }
//! ```

use crate::questionnaire::Questionnaire;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Section that collects question ids the questionnaire does not define
pub const ADDITIONAL_SECTION: &str = "additional";

/// Suffix appended to a question id for its free-text elaboration
pub const CUSTOM_SUFFIX: &str = "_custom";

/// One answer value
///
/// Image-derived answers are not guaranteed to match the questionnaire types,
/// so anything that is neither a string nor a list of strings is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Single(String),
    Multiple(Vec<String>),
    Other(serde_json::Value),
}

impl Answer {
    /// True if this answer is `value` or a selection containing `value`
    pub fn includes(&self, value: &str) -> bool {
        match self {
            Answer::Single(s) => s == value,
            Answer::Multiple(values) => values.iter().any(|v| v == value),
            Answer::Other(_) => false,
        }
    }
}

/// Raw answers for one assessment session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(default)]
    pub answers: BTreeMap<String, Answer>,
    #[serde(default)]
    pub custom_answers: BTreeMap<String, String>,
}

impl Observation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a single-choice value (replaces any previous answer)
    pub fn select(&mut self, question_id: &str, value: &str) {
        self.answers
            .insert(question_id.to_string(), Answer::Single(value.to_string()));
    }

    /// Check or uncheck a multi-select value
    ///
    /// Checking an already-selected value is a no-op, so the selection never
    /// holds duplicates and keeps the order values were first checked in.
    pub fn toggle(&mut self, question_id: &str, value: &str, checked: bool) {
        let entry = self
            .answers
            .entry(question_id.to_string())
            .or_insert_with(|| Answer::Multiple(Vec::new()));

        if !matches!(entry, Answer::Multiple(_)) {
            *entry = Answer::Multiple(Vec::new());
        }

        if let Answer::Multiple(values) = entry {
            if checked {
                if !values.iter().any(|v| v == value) {
                    values.push(value.to_string());
                }
            } else {
                values.retain(|v| v != value);
            }
        }
    }

    pub fn set_custom(&mut self, question_id: &str, text: &str) {
        self.custom_answers
            .insert(question_id.to_string(), text.to_string());
    }

    /// Build from image-derived answers (a flat JSON object keyed by question id)
    pub fn from_image_answers(fields: serde_json::Map<String, serde_json::Value>) -> Self {
        let answers = fields
            .into_iter()
            .map(|(id, value)| {
                let answer = serde_json::from_value::<Answer>(value.clone())
                    .unwrap_or(Answer::Other(value));
                (id, answer)
            })
            .collect();

        Self {
            answers,
            custom_answers: BTreeMap::new(),
        }
    }
}

/// Section-grouped answers, ready for the scoring request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedObservation {
    sections: BTreeMap<String, BTreeMap<String, Answer>>,
}

impl NormalizedObservation {
    pub fn sections(&self) -> &BTreeMap<String, BTreeMap<String, Answer>> {
        &self.sections
    }

    /// Look up an answer by question id regardless of section
    pub fn answer(&self, question_id: &str) -> Option<&Answer> {
        self.sections
            .values()
            .find_map(|answers| answers.get(question_id))
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Pretty JSON for prompts and logs
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.sections).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Normalize answers against the built-in garden questionnaire
pub fn normalize(
    answers: &BTreeMap<String, Answer>,
    custom_answers: &BTreeMap<String, String>,
) -> NormalizedObservation {
    normalize_with(&Questionnaire::garden(), answers, custom_answers)
}

/// Normalize answers against an explicit questionnaire definition
///
/// Unknown question ids are kept under [`ADDITIONAL_SECTION`]. Custom text is
/// attached as `<id>_custom` next to its answer when non-blank.
pub fn normalize_with(
    questionnaire: &Questionnaire,
    answers: &BTreeMap<String, Answer>,
    custom_answers: &BTreeMap<String, String>,
) -> NormalizedObservation {
    let mut sections: BTreeMap<String, BTreeMap<String, Answer>> = BTreeMap::new();

    for (question_id, answer) in answers {
        let section = questionnaire
            .section_of(question_id)
            .unwrap_or(ADDITIONAL_SECTION);

        if section == ADDITIONAL_SECTION {
            tracing::debug!("Passing through unknown question id '{}'", question_id);
        }

        let group = sections.entry(section.to_string()).or_default();
        group.insert(question_id.clone(), answer.clone());

        if let Some(text) = custom_answers.get(question_id) {
            if !text.trim().is_empty() {
                group.insert(
                    format!("{}{}", question_id, CUSTOM_SUFFIX),
                    Answer::Single(text.clone()),
                );
            }
        }
    }

    NormalizedObservation { sections }
}

/// Normalize a full [`Observation`]
pub fn normalize_observation(observation: &Observation) -> NormalizedObservation {
    normalize(&observation.answers, &observation.custom_answers)
}
