//! Analyzer - coordinates one recommendation run
//!
//! observation → scoring request → reasoning service → validation → ranking
//!
//! The analyzer holds no per-session state; one instance is shared across all
//! requests. Callers are responsible for not running two analyses for the
//! same session at once.

use crate::data::MeasureCatalog;
use crate::error::{ObservationError, ResponseIssue, TransportError};
use crate::prompt::{build_image_analysis_request, build_scoring_request};
use crate::questionnaire::Questionnaire;
use crate::reasoning::ReasoningService;
use crate::scorer::{rank_with_issues, RankedRecommendation, RecommendationSet, ScoreScale};
use crate::utils::normalization::{normalize_observation, NormalizedObservation, Observation};
use crate::validation::{strip_code_fences, ResponseValidator, UncheckedScores};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Message shown when the reasoning service cannot be reached
pub const TRANSPORT_ERROR_MESSAGE: &str =
    "The analysis service is unavailable. Please try again or use the alternative input method.";

/// Result of one analysis: `{error: null, data}` or `{error, data: fallback}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub error: Option<String>,
    pub data: RecommendationSet,
}

impl RecommendationResult {
    pub fn ok(data: RecommendationSet) -> Self {
        Self { error: None, data }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct Analyzer {
    service: Arc<dyn ReasoningService>,
    catalog: Arc<MeasureCatalog>,
    questionnaire: Questionnaire,
    scale: ScoreScale,
}

impl Analyzer {
    pub fn new(service: Arc<dyn ReasoningService>, catalog: Arc<MeasureCatalog>) -> Self {
        Self {
            service,
            catalog,
            questionnaire: Questionnaire::garden(),
            scale: ScoreScale::default(),
        }
    }

    pub fn catalog(&self) -> &MeasureCatalog {
        &self.catalog
    }

    pub fn questionnaire(&self) -> &Questionnaire {
        &self.questionnaire
    }

    pub fn scale(&self) -> ScoreScale {
        self.scale
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    /// Analyze a normalized observation
    ///
    /// Transport failures come back as `error` plus the default set; malformed
    /// replies are absorbed (`error` stays `None`).
    pub async fn analyze(&self, observation: &NormalizedObservation) -> RecommendationResult {
        match self.try_analyze(observation).await {
            Ok(set) => RecommendationResult::ok(set),
            Err(e) => self.transport_failure(e),
        }
    }

    /// Analyze, propagating transport failures
    pub async fn try_analyze(
        &self,
        observation: &NormalizedObservation,
    ) -> Result<RecommendationSet, TransportError> {
        let request = build_scoring_request(observation, &self.catalog, self.scale);
        tracing::info!(
            "Requesting recommendations from {} ({} sections)",
            self.service.name(),
            observation.sections().len()
        );

        let reply = self.service.complete(&request).await?;
        Ok(self.interpret_reply(&reply))
    }

    /// Validate and rank a raw reply
    pub fn interpret_reply(&self, reply: &str) -> RecommendationSet {
        let validated = ResponseValidator::new(&self.catalog, self.scale).validate(reply);
        let set = RecommendationSet::from_validated(validated, &self.catalog, self.scale);

        tracing::info!(
            "Ranked {} recommendations (fallback: {}, issues: {})",
            set.recommendations.len(),
            set.fallback,
            set.issues.len()
        );
        set
    }

    /// Analyze garden photos: derive answers first, then score them
    ///
    /// Invalid URLs are rejected before any service call.
    pub async fn analyze_images(
        &self,
        image_urls: &[String],
    ) -> Result<RecommendationResult, ObservationError> {
        let request = build_image_analysis_request(&self.questionnaire, image_urls)?;
        tracing::info!("Analyzing {} garden images with {}", image_urls.len(), self.service.name());

        let reply = match self.service.complete(&request).await {
            Ok(reply) => reply,
            Err(e) => return Ok(self.transport_failure(e)),
        };

        let observation = match parse_image_answers(&reply) {
            Ok(observation) => observation,
            Err(issue) => {
                return Ok(RecommendationResult::ok(RecommendationSet::fallback(
                    &self.catalog,
                    self.scale,
                    issue,
                )));
            }
        };

        let normalized = normalize_observation(&observation);
        Ok(self.analyze(&normalized).await)
    }

    /// Rank caller-supplied score entries against this analyzer's catalog
    ///
    /// Entries are repaired field by field first; unusable values and
    /// unknown ids end up in the returned issues rather than failing the call.
    pub fn rank_unchecked(
        &self,
        entries: Vec<UncheckedScores>,
    ) -> (Vec<RankedRecommendation>, Vec<ResponseIssue>) {
        let mut issues = Vec::new();
        let scored = ResponseValidator::new(&self.catalog, self.scale)
            .repair_unchecked_all(entries, &mut issues);

        let (ranked, mismatches) = rank_with_issues(&scored, &self.catalog, self.scale);
        issues.extend(mismatches);

        tracing::info!("Ranked {} caller-scored measures ({} issues)", ranked.len(), issues.len());
        (ranked, issues)
    }

    fn transport_failure(&self, error: TransportError) -> RecommendationResult {
        tracing::error!("Reasoning service call failed: {}", error);
        RecommendationResult {
            error: Some(TRANSPORT_ERROR_MESSAGE.to_string()),
            data: RecommendationSet::fallback(
                &self.catalog,
                self.scale,
                ResponseIssue::transport(&error),
            ),
        }
    }
}

/// Parse the image-analysis reply into an observation
fn parse_image_answers(reply: &str) -> Result<Observation, ResponseIssue> {
    let text = strip_code_fences(reply);
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(fields)) => Ok(Observation::from_image_answers(fields)),
        Ok(other) => Err(ResponseIssue::malformed(format!(
            "image analysis reply is not an object: {}",
            other
        ))),
        Err(e) => Err(ResponseIssue::malformed(format!(
            "image analysis reply is not JSON: {}",
            e
        ))),
    }
}
