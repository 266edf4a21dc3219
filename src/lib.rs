//! Measure Scorer
//!
//! Recommendation scoring and ranking for garden biodiversity measures.
//!
//! Pipeline:
//! - `utils/`: Normalization of questionnaire (or image-derived) answers
//! - `prompt`: Scoring and image-analysis requests for the reasoning service
//! - `reasoning/`: Reasoning service boundary (OpenAI-compatible, rule-based)
//! - `validation`: Repair of untrusted replies, with a fixed fallback set
//! - `scorer`: Point computation and deterministic ranking
//! - `explanation/`: Measure cards for presentation layers
//!
//! `analyzer` ties the steps together; `api_server` exposes them over HTTP
//! behind the `api` feature.

pub mod utils;
pub mod data;
pub mod questionnaire;
pub mod prompt;
pub mod validation;
pub mod scorer;
pub mod reasoning;
pub mod analyzer;
pub mod challenges;
pub mod explanation;
pub mod config;
pub mod error;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use utils::{normalize, normalize_observation, Answer, NormalizedObservation, Observation};
pub use data::{Measure, MeasureCatalog};
pub use questionnaire::Questionnaire;
pub use scorer::{rank, RankedRecommendation, RecommendationSet, ScoreScale, ScoredMeasure};
pub use validation::{ResponseValidator, UncheckedScores, ValidatedResponse, DEFAULT_RECOMMENDATION_SET};
pub use reasoning::{OpenAiClient, ReasoningService, RuleBasedService};
pub use analyzer::{Analyzer, RecommendationResult, TRANSPORT_ERROR_MESSAGE};
pub use config::ServiceConfig;
pub use error::{ObservationError, ResponseIssue, TransportError};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};
