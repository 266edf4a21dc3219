//! Scoring Request Builder
//!
//! Renders observations and the measure catalog into requests for the
//! reasoning service. Pure string building, no I/O.

use crate::data::MeasureCatalog;
use crate::error::ObservationError;
use crate::questionnaire::{QuestionKind, Questionnaire};
use crate::scorer::ScoreScale;
use crate::utils::normalization::NormalizedObservation;
use crate::validation::{
    DIFFICULTY_REASONINGS, DIFFICULTY_SCORES, ENVIRONMENT_REASONINGS, ENVIRONMENT_SCORES,
    IMPACT_REASONINGS, IMPACT_SCORES, RECOMMENDATIONS,
};
use std::fmt::Write;
use url::Url;

/// What a request asks the service to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Score catalog measures for an observation
    Scoring,
    /// Derive questionnaire answers from garden photos
    ImageAnalysis,
}

/// User-side content of a request
#[derive(Debug, Clone, PartialEq)]
pub enum UserContent {
    /// Rendered observation text plus the structured observation it came from
    Observation {
        text: String,
        observation: NormalizedObservation,
    },
    /// Publicly fetchable image URLs
    Images(Vec<String>),
}

/// One request to the reasoning service
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringRequest {
    pub kind: RequestKind,
    pub system: String,
    pub user: UserContent,
}

/// Build the measure-scoring request for an observation
pub fn build_scoring_request(
    observation: &NormalizedObservation,
    catalog: &MeasureCatalog,
    scale: ScoreScale,
) -> ScoringRequest {
    let system = render_scoring_instructions(catalog, scale);

    let mut text = String::with_capacity(512);
    text.push_str("Garden questionnaire responses, grouped by section:\n\n");
    text.push_str(&observation.to_pretty_json());

    ScoringRequest {
        kind: RequestKind::Scoring,
        system,
        user: UserContent::Observation {
            text,
            observation: observation.clone(),
        },
    }
}

fn render_scoring_instructions(catalog: &MeasureCatalog, scale: ScoreScale) -> String {
    let (min, max) = (scale.min(), scale.max());
    let mut s = String::with_capacity(2048);

    s.push_str(
        "You are a garden biodiversity expert. Based on the questionnaire responses, \
         recommend the most suitable biodiversity measures and score each one for this garden.\n\n",
    );

    let _ = writeln!(s, "Available measures (catalog {}):", catalog.version());
    for measure in catalog.measures() {
        let _ = writeln!(s, "{} = {}", measure.id, measure.title);
    }
    let _ = writeln!(
        s,
        "\nOnly use the measure ids listed above (1-{}). Never invent other ids.\n",
        catalog.max_id()
    );

    let _ = writeln!(s, "Score scale: {} (integers from {} to {}).", scale.tag(), min, max);
    let _ = writeln!(
        s,
        "- {}: how well the measure fits this garden's environment ({} = poor fit, {} = ideal fit)",
        ENVIRONMENT_SCORES, min, max
    );
    let _ = writeln!(
        s,
        "- {}: how easy the measure is to implement here ({} = very hard, {} = very easy)",
        DIFFICULTY_SCORES, min, max
    );
    let _ = writeln!(
        s,
        "- {}: expected biodiversity benefit in this garden ({} = minimal, {} = very high)\n",
        IMPACT_SCORES, min, max
    );

    s.push_str("Respond with ONLY a JSON object with exactly these keys:\n");
    let _ = writeln!(s, "- \"{}\": array of recommended measure ids", RECOMMENDATIONS);
    for key in [ENVIRONMENT_SCORES, DIFFICULTY_SCORES, IMPACT_SCORES] {
        let _ = writeln!(s, "- \"{}\": object mapping measure id to a number", key);
    }
    for key in [DIFFICULTY_REASONINGS, IMPACT_REASONINGS, ENVIRONMENT_REASONINGS] {
        let _ = writeln!(s, "- \"{}\": object mapping measure id to a short explanation string", key);
    }
    s.push_str(
        "\nEvery recommended id must have an entry in every score and reasoning object. \
         Reasonings must be plain strings. Do not wrap the JSON in markdown.\n\nExample:\n",
    );
    let _ = writeln!(
        s,
        "{{\"{r}\": [1, 4], \"{es}\": {{\"1\": 4, \"4\": 5}}, \"{ds}\": {{\"1\": 4, \"4\": 2}}, \
         \"{is}\": {{\"1\": 4, \"4\": 5}}, \"{dr}\": {{\"1\": \"...\", \"4\": \"...\"}}, \
         \"{ir}\": {{\"1\": \"...\", \"4\": \"...\"}}, \"{er}\": {{\"1\": \"...\", \"4\": \"...\"}}}}",
        r = RECOMMENDATIONS,
        es = ENVIRONMENT_SCORES,
        ds = DIFFICULTY_SCORES,
        is = IMPACT_SCORES,
        dr = DIFFICULTY_REASONINGS,
        ir = IMPACT_REASONINGS,
        er = ENVIRONMENT_REASONINGS,
    );

    s
}

/// Check that every image URL is an absolute https URL
pub fn validate_image_urls(urls: &[String]) -> Result<(), ObservationError> {
    if urls.is_empty() {
        return Err(ObservationError::NoImages);
    }

    for raw in urls {
        let parsed = Url::parse(raw).map_err(|e| ObservationError::InvalidImageUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        if parsed.scheme() != "https" {
            return Err(ObservationError::InvalidImageUrl {
                url: raw.clone(),
                reason: format!("scheme '{}' is not https", parsed.scheme()),
            });
        }
    }

    Ok(())
}

/// Build the request that turns garden photos into questionnaire answers
pub fn build_image_analysis_request(
    questionnaire: &Questionnaire,
    image_urls: &[String],
) -> Result<ScoringRequest, ObservationError> {
    validate_image_urls(image_urls)?;

    let mut s = String::with_capacity(2048);
    s.push_str(
        "You are a garden biodiversity expert analyzing garden images. Assess the garden's \
         biodiversity and management practices and answer each field below.\n\n",
    );

    for (n, question) in questionnaire.questions().enumerate() {
        let values: Vec<String> = question
            .options
            .iter()
            .map(|o| format!("\"{}\"", o.value))
            .collect();
        match question.kind {
            QuestionKind::Single => {
                let _ = writeln!(s, "{}. {}: ({})", n + 1, question.id, values.join(", "));
            }
            QuestionKind::Multiple => {
                let _ = writeln!(s, "{}. {}: Array of [{}]", n + 1, question.id, values.join(", "));
            }
        }
    }

    s.push_str(
        "\nRespond with ONLY a JSON object keyed by the field names above, using only the listed values.\n",
    );

    Ok(ScoringRequest {
        kind: RequestKind::ImageAnalysis,
        system: s,
        user: UserContent::Images(image_urls.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::normalization::Observation;
    use crate::utils::normalize_observation;

    #[test]
    fn test_scoring_request_enumerates_catalog() {
        let catalog = MeasureCatalog::builtin();
        let mut obs = Observation::new();
        obs.select("landSize", "small");
        let request = build_scoring_request(&normalize_observation(&obs), &catalog, ScoreScale::FivePoint);

        assert_eq!(request.kind, RequestKind::Scoring);
        for measure in catalog.measures() {
            let line = format!("{} = {}", measure.id, measure.title);
            assert!(request.system.contains(&line), "missing '{}'", line);
        }
        assert!(request.system.contains("1-15"));
    }

    #[test]
    fn test_scoring_request_states_contract() {
        let catalog = MeasureCatalog::builtin();
        let request = build_scoring_request(
            &NormalizedObservation::default(),
            &catalog,
            ScoreScale::FivePoint,
        );

        for key in [
            RECOMMENDATIONS,
            ENVIRONMENT_SCORES,
            DIFFICULTY_SCORES,
            IMPACT_SCORES,
            DIFFICULTY_REASONINGS,
            IMPACT_REASONINGS,
            ENVIRONMENT_REASONINGS,
        ] {
            assert!(request.system.contains(&format!("\"{}\"", key)), "missing key {}", key);
        }
        assert!(request.system.contains("five-point-v1"));
        assert!(request.system.contains("from 1 to 5"));
        assert!(request.system.contains("every score and reasoning object"));
    }

    #[test]
    fn test_scoring_request_carries_observation() {
        let catalog = MeasureCatalog::builtin();
        let mut obs = Observation::new();
        obs.select("waterFeatures", "no_water");
        let normalized = normalize_observation(&obs);

        let request = build_scoring_request(&normalized, &catalog, ScoreScale::FivePoint);
        match request.user {
            UserContent::Observation { text, observation } => {
                assert!(text.contains("\"waterFeatures\": \"no_water\""));
                assert_eq!(observation, normalized);
            }
            UserContent::Images(_) => panic!("expected observation content"),
        }
    }

    #[test]
    fn test_image_request_lists_fields() {
        let urls = vec!["https://cdn.example.org/garden/1.jpg".to_string()];
        let request = build_image_analysis_request(&Questionnaire::garden(), &urls).unwrap();

        assert_eq!(request.kind, RequestKind::ImageAnalysis);
        assert!(request.system.contains("1. landSize: (\"small\", \"medium\", \"large\")"));
        assert!(request.system.contains("vegetationTypes: Array of ["));
        assert!(request.system.contains("17. aspectsToImprove"));
        assert_eq!(request.user, UserContent::Images(urls));
    }

    #[test]
    fn test_image_urls_must_be_https() {
        assert_eq!(validate_image_urls(&[]), Err(ObservationError::NoImages));
        assert!(validate_image_urls(&["https://a.example/x.png".into()]).is_ok());
        assert!(matches!(
            validate_image_urls(&["http://a.example/x.png".into()]),
            Err(ObservationError::InvalidImageUrl { .. })
        ));
        assert!(matches!(
            validate_image_urls(&["not a url".into()]),
            Err(ObservationError::InvalidImageUrl { .. })
        ));
    }
}
