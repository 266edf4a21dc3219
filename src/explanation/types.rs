use serde::{Deserialize, Serialize};

/// Shown in place of missing reasoning text
pub const NO_REASONING: &str = "No reasoning available";

/// Everything a presentation layer needs to render one analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationView {
    pub scale: String,
    pub max_total: u32,
    /// Set when the default set was shown instead of a tailored ranking
    pub notice: Option<String>,
    pub cards: Vec<MeasureCard>,
}

/// One ranked measure as a card
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureCard {
    pub rank: usize,
    pub measure_id: u32,
    pub emoji: String,
    pub title: String,
    pub total_points: u32,
    /// total / max_total as a percentage (0-100)
    pub progress: f64,
    pub points: Vec<PointLine>,
    pub description: String,
    pub benefits: Vec<String>,
    pub implementation_tips: String,
}

/// A single point component with its reasoning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointLine {
    pub label: String,  // "Difficulty Points"
    pub points: u32,
    pub reasoning: String,
}
