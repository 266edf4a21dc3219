//! Response Validation and Repair
//!
//! Turns the reasoning service's raw reply into trusted [`ScoredMeasure`]s.
//!
//! Pipeline:
//! 1. Strip code fences and whitespace
//! 2. Parse JSON (failure → fallback set)
//! 3. Shape check: canonical object, recommendations-only object, bare id
//!    array, or a `{"data": {...}}` envelope (no id list → fallback set)
//! 4. Per-field repair: bad ids, scores and reasonings are dropped one by one
//! 5. [`DEFAULT_RECOMMENDATION_SET`] whenever nothing usable survives
//!
//! Nothing in here returns an error. Every absorbed problem is recorded as a
//! [`ResponseIssue`] on the result.

use crate::data::MeasureCatalog;
use crate::error::ResponseIssue;
use crate::scorer::{ScoreScale, ScoredMeasure};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::{Map, Value};

pub const RECOMMENDATIONS: &str = "recommendations";
pub const ENVIRONMENT_SCORES: &str = "environmentScores";
pub const DIFFICULTY_SCORES: &str = "difficultyScores";
pub const IMPACT_SCORES: &str = "impactScores";
pub const ENVIRONMENT_REASONINGS: &str = "environmentReasonings";
pub const DIFFICULTY_REASONINGS: &str = "difficultyReasonings";
pub const IMPACT_REASONINGS: &str = "impactReasonings";

/// Fixed recommendation set used whenever the reply cannot be trusted
#[derive(Debug, Clone, Copy)]
pub struct FallbackSet {
    pub measure_ids: &'static [u32],
    pub environment_reasoning: &'static str,
    pub difficulty_reasoning: &'static str,
    pub impact_reasoning: &'static str,
}

/// Four low-effort, high-impact measures that suit almost any garden
pub const DEFAULT_RECOMMENDATION_SET: FallbackSet = FallbackSet {
    measure_ids: &[1, 2, 8, 15],
    environment_reasoning: "General recommendation that suits most gardens.",
    difficulty_reasoning: "Based on the typical effort needed for this measure.",
    impact_reasoning: "Based on the typical biodiversity benefit of this measure.",
};

impl FallbackSet {
    /// Entries without per-garden scores, so ranking uses catalog baselines
    pub fn scored_measures(&self) -> Vec<ScoredMeasure> {
        self.measure_ids
            .iter()
            .map(|&measure_id| ScoredMeasure {
                measure_id,
                environment_reasoning: Some(self.environment_reasoning.to_string()),
                difficulty_reasoning: Some(self.difficulty_reasoning.to_string()),
                impact_reasoning: Some(self.impact_reasoning.to_string()),
                ..ScoredMeasure::default()
            })
            .collect()
    }
}

/// Reasoning as it arrives on the wire
///
/// Older replies wrapped the text as `{"_type": "...", "value": "..."}` (or
/// `type`). Both forms collapse to plain text on ingestion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Reasoning {
    PlainText(String),
    Wrapped {
        #[serde(rename = "type", alias = "_type", default)]
        tag: Option<String>,
        value: String,
    },
}

impl Reasoning {
    /// Parse a reasoning value; anything unrecognised is absent
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn into_text(self) -> String {
        match self {
            Reasoning::PlainText(text) => text,
            Reasoning::Wrapped { value, .. } => value,
        }
    }
}

/// Validator output: repaired entries in recommendation order
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedResponse {
    pub measures: Vec<ScoredMeasure>,
    pub fallback: bool,
    pub issues: Vec<ResponseIssue>,
}

impl ValidatedResponse {
    /// The fixed fallback set, recording why it was used
    pub fn fallback(issue: ResponseIssue) -> Self {
        tracing::warn!("Using default recommendation set: {:?}", issue);
        Self {
            measures: DEFAULT_RECOMMENDATION_SET.scored_measures(),
            fallback: true,
            issues: vec![issue],
        }
    }

    pub fn measure_ids(&self) -> Vec<u32> {
        self.measures.iter().map(|m| m.measure_id).collect()
    }
}

/// Remove markdown code-fence markers around a reply
///
/// Handles "```json\n{...}\n```", "```{...}```" and unfenced text.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop an optional language tag such as `json`
        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        text = rest[tag_len..].trim_start();
    }

    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }

    text
}

/// Validates and repairs replies against one catalog and scale
pub struct ResponseValidator<'a> {
    catalog: &'a MeasureCatalog,
    scale: ScoreScale,
}

impl<'a> ResponseValidator<'a> {
    pub fn new(catalog: &'a MeasureCatalog, scale: ScoreScale) -> Self {
        Self { catalog, scale }
    }

    /// Validate a raw service reply. Never fails.
    pub fn validate(&self, raw: &str) -> ValidatedResponse {
        let text = strip_code_fences(raw);
        if text.is_empty() {
            return ValidatedResponse::fallback(ResponseIssue::malformed("empty reply"));
        }

        let parsed: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("Unparseable reply: {}", text);
                return ValidatedResponse::fallback(ResponseIssue::malformed(format!(
                    "reply is not JSON: {}",
                    e
                )));
            }
        };

        self.validate_value(parsed)
    }

    /// Validate an already-parsed reply
    pub fn validate_value(&self, parsed: Value) -> ValidatedResponse {
        let mut issues = Vec::new();

        let (raw_ids, fields) = match unwrap_envelope(parsed) {
            Value::Array(items) => {
                issues.push(ResponseIssue::partial(
                    RECOMMENDATIONS,
                    "reply is a bare id list without scores",
                ));
                (items, Map::new())
            }
            Value::Object(mut map) => match map.remove(RECOMMENDATIONS) {
                Some(Value::Array(items)) => (items, map),
                Some(other) => {
                    return ValidatedResponse::fallback(ResponseIssue::malformed(format!(
                        "`{}` is not a list: {}",
                        RECOMMENDATIONS, other
                    )));
                }
                None => {
                    return ValidatedResponse::fallback(ResponseIssue::malformed(format!(
                        "reply has no `{}`",
                        RECOMMENDATIONS
                    )));
                }
            },
            other => {
                return ValidatedResponse::fallback(ResponseIssue::malformed(format!(
                    "unexpected reply shape: {}",
                    type_name(&other)
                )));
            }
        };

        let ids = self.repair_ids(&raw_ids, &mut issues);
        if ids.is_empty() {
            let mut fallback = ValidatedResponse::fallback(ResponseIssue::malformed(
                "no valid measure ids after repair",
            ));
            issues.append(&mut fallback.issues);
            fallback.issues = issues;
            return fallback;
        }

        let environment = self.repair_scores(&fields, ENVIRONMENT_SCORES, &ids, &mut issues);
        let difficulty = self.repair_scores(&fields, DIFFICULTY_SCORES, &ids, &mut issues);
        let impact = self.repair_scores(&fields, IMPACT_SCORES, &ids, &mut issues);
        let mut env_reasons = repair_reasonings(&fields, ENVIRONMENT_REASONINGS, &ids, &mut issues);
        let mut diff_reasons = repair_reasonings(&fields, DIFFICULTY_REASONINGS, &ids, &mut issues);
        let mut impact_reasons = repair_reasonings(&fields, IMPACT_REASONINGS, &ids, &mut issues);

        let measures = ids
            .iter()
            .map(|&id| ScoredMeasure {
                measure_id: id,
                environment_score: environment.get(&id).copied(),
                difficulty_score: difficulty.get(&id).copied(),
                impact_score: impact.get(&id).copied(),
                environment_reasoning: env_reasons.remove(&id),
                difficulty_reasoning: diff_reasons.remove(&id),
                impact_reasoning: impact_reasons.remove(&id),
            })
            .collect();

        if !issues.is_empty() {
            tracing::debug!("Repaired reply with {} field issues", issues.len());
        }

        ValidatedResponse {
            measures,
            fallback: false,
            issues,
        }
    }

    /// Keep integral ids in [1, max catalog id], first occurrence wins
    fn repair_ids(&self, raw: &[Value], issues: &mut Vec<ResponseIssue>) -> Vec<u32> {
        let max_id = self.catalog.max_id();
        let mut ids: Vec<u32> = Vec::with_capacity(raw.len());

        for value in raw {
            match as_integer(value) {
                Some(id) if id >= 1 && id <= max_id as i64 => {
                    let id = id as u32;
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                _ => issues.push(ResponseIssue::partial(
                    RECOMMENDATIONS,
                    format!("dropped invalid id {}", value),
                )),
            }
        }

        ids
    }

    fn repair_scores(
        &self,
        fields: &Map<String, Value>,
        field: &str,
        ids: &[u32],
        issues: &mut Vec<ResponseIssue>,
    ) -> FxHashMap<u32, u8> {
        let mut scores = FxHashMap::default();

        let entries = match fields.get(field) {
            Some(Value::Object(entries)) => entries,
            Some(other) => {
                issues.push(ResponseIssue::partial(
                    field,
                    format!("expected a mapping, got {}", type_name(other)),
                ));
                return scores;
            }
            None => {
                issues.push(ResponseIssue::partial(field, "missing"));
                return scores;
            }
        };

        for (key, value) in entries {
            let Some(id) = recommended_key(key, ids) else {
                issues.push(ResponseIssue::partial(
                    field,
                    format!("key '{}' is not a recommended id", key),
                ));
                continue;
            };

            match self.score_in_scale(value) {
                Some(score) => {
                    scores.insert(id, score);
                }
                None => issues.push(ResponseIssue::partial(
                    field,
                    format!("measure {}: score {} outside {}", id, value, self.scale.tag()),
                )),
            }
        }

        scores
    }

    /// Integral score inside the scale, or `None`
    fn score_in_scale(&self, value: &Value) -> Option<u8> {
        as_integer(value)
            .filter(|&score| score >= self.scale.min() as i64 && score <= self.scale.max() as i64)
            .map(|score| score as u8)
    }

    /// Repair caller-supplied scores for one measure
    ///
    /// Unusable ids drop the entry; unusable scores and reasonings drop only
    /// that field, so ranking substitutes the baseline (or zero).
    pub fn repair_unchecked(
        &self,
        raw: UncheckedScores,
        issues: &mut Vec<ResponseIssue>,
    ) -> Option<ScoredMeasure> {
        let measure_id = match as_integer(&raw.measure_id) {
            Some(id) if id >= 1 && id <= u32::MAX as i64 => id as u32,
            _ => {
                issues.push(ResponseIssue::partial(
                    "measureId",
                    format!("dropped invalid id {}", raw.measure_id),
                ));
                return None;
            }
        };

        let mut score = |field: &str, value: Option<Value>| -> Option<u8> {
            let value = value.filter(|v| !v.is_null())?;
            let score = self.score_in_scale(&value);
            if score.is_none() {
                issues.push(ResponseIssue::partial(
                    field,
                    format!("measure {}: score {} outside {}", measure_id, value, self.scale.tag()),
                ));
            }
            score
        };
        let environment_score = score("environmentScore", raw.environment_score);
        let difficulty_score = score("difficultyScore", raw.difficulty_score);
        let impact_score = score("impactScore", raw.impact_score);

        let text = |value: Option<Value>| {
            value
                .as_ref()
                .and_then(Reasoning::from_value)
                .map(Reasoning::into_text)
        };

        Some(ScoredMeasure {
            measure_id,
            environment_score,
            difficulty_score,
            impact_score,
            environment_reasoning: text(raw.environment_reasoning),
            difficulty_reasoning: text(raw.difficulty_reasoning),
            impact_reasoning: text(raw.impact_reasoning),
        })
    }

    /// Repair a batch of caller-supplied scores, keeping input order
    pub fn repair_unchecked_all(
        &self,
        raw: Vec<UncheckedScores>,
        issues: &mut Vec<ResponseIssue>,
    ) -> Vec<ScoredMeasure> {
        raw.into_iter()
            .filter_map(|entry| self.repair_unchecked(entry, issues))
            .collect()
    }
}

/// Scores as a caller sends them, before any type or range check
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UncheckedScores {
    #[serde(default)]
    pub measure_id: Value,
    #[serde(default)]
    pub environment_score: Option<Value>,
    #[serde(default)]
    pub difficulty_score: Option<Value>,
    #[serde(default)]
    pub impact_score: Option<Value>,
    #[serde(default)]
    pub environment_reasoning: Option<Value>,
    #[serde(default)]
    pub difficulty_reasoning: Option<Value>,
    #[serde(default)]
    pub impact_reasoning: Option<Value>,
}

fn repair_reasonings(
    fields: &Map<String, Value>,
    field: &str,
    ids: &[u32],
    issues: &mut Vec<ResponseIssue>,
) -> FxHashMap<u32, String> {
    let mut reasonings = FxHashMap::default();

    let entries = match fields.get(field) {
        Some(Value::Object(entries)) => entries,
        Some(other) => {
            issues.push(ResponseIssue::partial(
                field,
                format!("expected a mapping, got {}", type_name(other)),
            ));
            return reasonings;
        }
        None => return reasonings,
    };

    for (key, value) in entries {
        let Some(id) = recommended_key(key, ids) else {
            continue;
        };

        match Reasoning::from_value(value) {
            Some(reasoning) => {
                reasonings.insert(id, reasoning.into_text());
            }
            None => issues.push(ResponseIssue::partial(
                field,
                format!("measure {}: unusable reasoning {}", id, type_name(value)),
            )),
        }
    }

    reasonings
}

/// Unwrap a `{"data": {...}}` envelope once
fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if !map.contains_key(RECOMMENDATIONS) => match map.remove("data") {
            Some(inner @ Value::Object(_)) => inner,
            Some(other) => {
                map.insert("data".to_string(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Integral JSON number (accepts `4` and `4.0`, rejects `4.5` and `"4"`)
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && f.is_finite())
        .map(|f| f as i64)
}

fn recommended_key(key: &str, ids: &[u32]) -> Option<u32> {
    key.trim().parse::<u32>().ok().filter(|id| ids.contains(id))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(raw: &str) -> ValidatedResponse {
        let catalog = MeasureCatalog::builtin();
        ResponseValidator::new(&catalog, ScoreScale::FivePoint).validate(raw)
    }

    fn assert_fallback(result: &ValidatedResponse) {
        assert!(result.fallback);
        assert_eq!(result.measure_ids(), vec![1, 2, 8, 15]);
        assert!(result
            .issues
            .iter()
            .any(|i| matches!(i, ResponseIssue::MalformedResponse { .. })));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  \n"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[1, 2]\n```"), "[1, 2]");
    }

    #[test]
    fn test_canonical_reply() {
        let result = validate(
            r#"{"recommendations":[1,4],"environmentScores":{"1":4,"4":5},"difficultyScores":{"1":2,"4":4},"impactScores":{"1":4,"4":5},"difficultyReasonings":{"1":"easy","4":"needs digging"},"impactReasonings":{"1":"good","4":"great"},"environmentReasonings":{"1":"fits","4":"fits well"}}"#,
        );

        assert!(!result.fallback);
        assert!(result.issues.is_empty(), "{:?}", result.issues);
        assert_eq!(result.measure_ids(), vec![1, 4]);

        let pond = &result.measures[1];
        assert_eq!(pond.environment_score, Some(5));
        assert_eq!(pond.difficulty_score, Some(4));
        assert_eq!(pond.impact_score, Some(5));
        assert_eq!(pond.difficulty_reasoning.as_deref(), Some("needs digging"));
    }

    #[test]
    fn test_code_fenced_recommendations_only() {
        let result = validate("```json\n{\"recommendations\":[1]}\n```");
        assert!(!result.fallback);
        assert_eq!(result.measures, vec![ScoredMeasure::baseline(1)]);
        // Three missing score maps, no reasoning issues
        assert_eq!(result.issues.len(), 3);
    }

    #[test]
    fn test_garbage_falls_back() {
        assert_fallback(&validate("Sorry, I cannot help with that."));
        assert_fallback(&validate(""));
        assert_fallback(&validate("   \n "));
        assert_fallback(&validate(r#"{"environmentScores":{"1":3}}"#));
        assert_fallback(&validate(r#"{"recommendations":"1,2"}"#));
        assert_fallback(&validate("42"));
    }

    #[test]
    fn test_fallback_carries_generic_reasoning() {
        let result = validate("not json");
        for measure in &result.measures {
            assert!(measure.environment_score.is_none());
            assert!(measure.difficulty_score.is_none());
            assert_eq!(
                measure.impact_reasoning.as_deref(),
                Some(DEFAULT_RECOMMENDATION_SET.impact_reasoning)
            );
        }
    }

    #[test]
    fn test_invalid_ids_filtered() {
        let result = validate(r#"{"recommendations":[0, 3, "5", 3, 16, 2.5, 7.0, -1, 99]}"#);
        assert_eq!(result.measure_ids(), vec![3, 7]);
    }

    #[test]
    fn test_all_ids_invalid_falls_back() {
        let result = validate(r#"{"recommendations":[0, 99, "x"]}"#);
        assert_fallback(&result);
        // Per-id issues are kept ahead of the fallback reason
        assert!(matches!(result.issues[0], ResponseIssue::PartialField { .. }));
    }

    #[test]
    fn test_out_of_range_scores_dropped_per_field() {
        let result = validate(
            r#"{"recommendations":[1,2],
                "environmentScores":{"1":11,"2":3},
                "difficultyScores":{"1":"2","2":0},
                "impactScores":{"1":4.0,"2":4.5,"9":5}}"#,
        );

        let hedgehog = &result.measures[0];
        let plants = &result.measures[1];
        assert_eq!(hedgehog.environment_score, None);
        assert_eq!(plants.environment_score, Some(3));
        assert_eq!(hedgehog.difficulty_score, None);
        assert_eq!(plants.difficulty_score, None);
        assert_eq!(hedgehog.impact_score, Some(4));
        assert_eq!(plants.impact_score, None);
        assert!(!result.fallback);
    }

    #[test]
    fn test_reasoning_shapes_normalize_to_text() {
        let result = validate(
            r#"{"recommendations":[1,2,3,4],
                "impactScores":{"1":4},
                "impactReasonings":{
                    "1":"Good fit",
                    "2":{"type":"x","value":"Good fit"},
                    "3":{"_type":"String","value":"Good fit"},
                    "4":{"type":"x","text":"missing value"}
                }}"#,
        );

        assert_eq!(result.measures[0].impact_reasoning.as_deref(), Some("Good fit"));
        assert_eq!(result.measures[1].impact_reasoning.as_deref(), Some("Good fit"));
        assert_eq!(result.measures[2].impact_reasoning.as_deref(), Some("Good fit"));
        assert_eq!(result.measures[3].impact_reasoning, None);
    }

    #[test]
    fn test_reasoning_enum_deserialization() {
        assert_eq!(
            Reasoning::from_value(&json!({"type": "x", "value": "Good fit"})),
            Some(Reasoning::Wrapped {
                tag: Some("x".into()),
                value: "Good fit".into()
            })
        );
        assert_eq!(Reasoning::from_value(&json!(3)), None);
        assert_eq!(Reasoning::from_value(&json!({"value": 3})), None);
    }

    #[test]
    fn test_bare_array_reply() {
        let result = validate("[1, 4, 8, 15]");
        assert!(!result.fallback);
        assert_eq!(result.measure_ids(), vec![1, 4, 8, 15]);
        assert!(result.measures.iter().all(|m| m.impact_score.is_none()));
    }

    #[test]
    fn test_data_envelope_unwrapped() {
        let result = validate(
            r#"{"error":null,"data":{"recommendations":[6],"environmentScores":{"6":2}}}"#,
        );
        assert!(!result.fallback);
        assert_eq!(result.measures[0].measure_id, 6);
        assert_eq!(result.measures[0].environment_score, Some(2));
    }

    #[test]
    fn test_non_mapping_scores_recorded() {
        let result = validate(r#"{"recommendations":[1],"impactScores":[4]}"#);
        assert!(!result.fallback);
        assert!(result.issues.contains(&ResponseIssue::partial(
            IMPACT_SCORES,
            "expected a mapping, got array"
        )));
    }

    #[test]
    fn test_unchecked_scores_repaired_per_field() {
        let catalog = MeasureCatalog::builtin();
        let validator = ResponseValidator::new(&catalog, ScoreScale::FivePoint);
        let raw: Vec<UncheckedScores> = serde_json::from_value(json!([
            {"measureId": 1, "environmentScore": 300, "difficultyScore": 4.0, "impactScore": 4.5},
            {"measureId": 4, "environmentScore": 11, "impactScore": -1, "impactReasoning": {"_type": "String", "value": "ponds"}},
            {"measureId": -3, "environmentScore": 2},
            {"measureId": 8, "difficultyScore": "3"}
        ]))
        .unwrap();

        let mut issues = Vec::new();
        let repaired = validator.repair_unchecked_all(raw, &mut issues);

        assert_eq!(repaired.len(), 3);
        assert_eq!(repaired[0].environment_score, None);
        assert_eq!(repaired[0].difficulty_score, Some(4));
        assert_eq!(repaired[0].impact_score, None);
        assert_eq!(repaired[1].environment_score, None);
        assert_eq!(repaired[1].impact_score, None);
        assert_eq!(repaired[1].impact_reasoning.as_deref(), Some("ponds"));
        assert_eq!(repaired[2].difficulty_score, None);
        // 300, 4.5, 11, -1, measureId -3, "3"
        assert_eq!(issues.len(), 6);
    }
}
