// Axum API Server Module
//
// Purpose: REST API over the recommendation pipeline (questionnaire and
// image analysis, ranking, challenge records)

#[cfg(feature = "api")]
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};

#[cfg(feature = "api")]
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};

#[cfg(feature = "api")]
use serde::Deserialize;

#[cfg(feature = "api")]
use std::collections::HashSet;

#[cfg(feature = "api")]
use std::sync::{Arc, Mutex};

#[cfg(feature = "api")]
use crate::analyzer::{Analyzer, RecommendationResult};

#[cfg(feature = "api")]
use crate::challenges::{build_records, ChallengeRecorder, ChallengeRequest};

#[cfg(feature = "api")]
use crate::error::ObservationError;

#[cfg(feature = "api")]
use crate::explanation::{
    ExplanationGenerator, JsonFormatter, JsonLayout, MarkdownFormatter, RecommendationView,
};

#[cfg(feature = "api")]
use crate::scorer::RecommendationSet;

#[cfg(feature = "api")]
use crate::validation::UncheckedScores;

#[cfg(feature = "api")]
use crate::utils::normalization::{normalize_observation, NormalizedObservation, Observation};

/// Header identifying the caller's session for the in-flight guard
pub const SESSION_HEADER: &str = "x-session-id";

// ============================================================================
// In-flight Analyses
// ============================================================================

/// Sessions with an analysis currently running
#[cfg(feature = "api")]
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    sessions: Mutex<HashSet<String>>,
}

#[cfg(feature = "api")]
impl InFlightRegistry {
    /// Claim the session, or `None` if it already has an analysis running
    pub fn try_acquire(self: &Arc<Self>, session: &str) -> Option<InFlightGuard> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if !sessions.insert(session.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            registry: Arc::clone(self),
            session: session.to_string(),
        })
    }

    pub fn is_running(&self, session: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(session)
    }
}

/// Releases the session when dropped, including when the handler future is
/// dropped because the client went away
#[cfg(feature = "api")]
pub struct InFlightGuard {
    registry: Arc<InFlightRegistry>,
    session: String,
}

#[cfg(feature = "api")]
impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry
            .sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.session);
    }
}

// ============================================================================
// Application State
// ============================================================================

#[cfg(feature = "api")]
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub recorder: Arc<dyn ChallengeRecorder>,
    pub in_flight: Arc<InFlightRegistry>,
}

#[cfg(feature = "api")]
impl AppState {
    pub fn new(analyzer: Arc<Analyzer>, recorder: Arc<dyn ChallengeRecorder>) -> Self {
        Self {
            analyzer,
            recorder,
            in_flight: Arc::new(InFlightRegistry::default()),
        }
    }

    /// Guard the session named in the request headers
    ///
    /// Requests without a session header are not guarded.
    fn claim_session(&self, headers: &HeaderMap) -> Result<Option<InFlightGuard>, AppError> {
        let Some(session) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) else {
            return Ok(None);
        };

        match self.in_flight.try_acquire(session) {
            Some(guard) => Ok(Some(guard)),
            None => {
                tracing::warn!("Rejecting duplicate analysis for session {}", session);
                Err(AppError::Conflict(
                    "An analysis is already running for this session".to_string(),
                ))
            }
        }
    }
}

// ============================================================================
// Router
// ============================================================================

#[cfg(feature = "api")]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Reference data
        .route("/api/questionnaire", get(get_questionnaire))
        .route("/api/measures", get(get_measures))

        // Observation endpoints
        .route("/api/observations/normalize", post(normalize_answers))

        // Analysis endpoints (one in flight per session)
        .route("/api/analyze/questionnaire", post(analyze_questionnaire))
        .route("/api/analyze/images", post(analyze_images))

        // Ranking and presentation
        .route("/api/rank", post(rank_measures))
        .route("/api/recommendations/render", post(render_recommendations))

        // Challenge records
        .route("/api/challenges", post(record_challenges))

        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new()) // gzip + brotli compression
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http()) // Request logging
        .with_state(state)
}

// ============================================================================
// Request Types
// ============================================================================

#[cfg(feature = "api")]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysisRequest {
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[cfg(feature = "api")]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankRequest {
    /// Scores arrive unchecked so one bad value cannot reject the whole batch
    pub scored_measures: Vec<UncheckedScores>,
}

#[cfg(feature = "api")]
#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub data: RecommendationSet,
    /// "json" (default), "json-pretty" or "markdown"
    #[serde(default)]
    pub format: Option<String>,
}

#[cfg(feature = "api")]
#[derive(Debug, Deserialize)]
pub struct ChallengeBatch {
    pub challenges: Vec<ChallengeRequest>,
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

#[cfg(feature = "api")]
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "reasoningService": state.analyzer.service_name(),
        "catalogVersion": state.analyzer.catalog().version(),
        "scale": state.analyzer.scale().tag(),
    }))
}

#[cfg(feature = "api")]
async fn get_questionnaire(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.analyzer.questionnaire().clone())
}

#[cfg(feature = "api")]
async fn get_measures(State(state): State<AppState>) -> impl IntoResponse {
    let catalog = state.analyzer.catalog();
    Json(serde_json::json!({
        "version": catalog.version(),
        "measures": catalog.measures(),
    }))
}

#[cfg(feature = "api")]
async fn normalize_answers(Json(observation): Json<Observation>) -> Json<NormalizedObservation> {
    Json(normalize_observation(&observation))
}

#[cfg(feature = "api")]
async fn analyze_questionnaire(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(observation): Json<Observation>,
) -> Result<Json<RecommendationResult>, AppError> {
    let _guard = state.claim_session(&headers)?;

    let normalized = normalize_observation(&observation);
    tracing::info!(
        "Analyzing questionnaire ({} answers, {} custom)",
        observation.answers.len(),
        observation.custom_answers.len()
    );

    Ok(Json(state.analyzer.analyze(&normalized).await))
}

#[cfg(feature = "api")]
async fn analyze_images(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ImageAnalysisRequest>,
) -> Result<Json<RecommendationResult>, AppError> {
    let _guard = state.claim_session(&headers)?;

    let result = state.analyzer.analyze_images(&payload.image_urls).await?;
    Ok(Json(result))
}

#[cfg(feature = "api")]
async fn rank_measures(
    State(state): State<AppState>,
    Json(payload): Json<RankRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (ranked, issues) = state.analyzer.rank_unchecked(payload.scored_measures);

    Ok(Json(serde_json::json!({
        "scale": state.analyzer.scale(),
        "catalogVersion": state.analyzer.catalog().version(),
        "recommendations": ranked,
        "issues": issues,
    })))
}

#[cfg(feature = "api")]
async fn render_recommendations(
    Json(payload): Json<RenderRequest>,
) -> Result<axum::response::Response, AppError> {
    let view: RecommendationView = ExplanationGenerator::generate(&payload.data);

    let format = payload.format.as_deref().unwrap_or("json");

    if let Some(layout) = JsonLayout::from_format_name(format) {
        let body = JsonFormatter::format(&view, layout)
            .map_err(|e| AppError::BadRequest(format!("Failed to serialize view: {}", e)))?;
        return Ok(([(axum::http::header::CONTENT_TYPE, "application/json")], body).into_response());
    }

    match format {
        "markdown" => Ok((
            [(axum::http::header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            MarkdownFormatter::format(&view),
        )
            .into_response()),
        other => Err(AppError::BadRequest(format!("Unknown format: {}", other))),
    }
}

#[cfg(feature = "api")]
async fn record_challenges(
    State(state): State<AppState>,
    Json(payload): Json<ChallengeBatch>,
) -> Result<Json<serde_json::Value>, AppError> {
    if payload.challenges.is_empty() {
        return Err(AppError::BadRequest("No challenges selected".to_string()));
    }

    let records = build_records(
        &payload.challenges,
        state.analyzer.catalog(),
        chrono::Utc::now(),
    )
    .map_err(|id| AppError::BadRequest(format!("Measure {} not found", id)))?;

    state.recorder.record(&records).await.map_err(|e| {
        tracing::error!("Failed to record challenges: {}", e);
        AppError::Upstream(format!("Failed to record challenges: {}", e))
    })?;

    Ok(Json(serde_json::json!({
        "recorded": records.len(),
        "challenges": records,
    })))
}

// ============================================================================
// Error Handling
// ============================================================================

#[cfg(feature = "api")]
#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Conflict(String),
    Upstream(String),
}

#[cfg(feature = "api")]
impl From<ObservationError> for AppError {
    fn from(err: ObservationError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[cfg(feature = "api")]
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
