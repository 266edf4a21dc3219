use crate::explanation::types::*;
use crate::scorer::{RankedRecommendation, RecommendationSet};

/// Builds card view models from a ranked recommendation set
pub struct ExplanationGenerator;

impl ExplanationGenerator {
    /// Generate the full view for a recommendation set
    pub fn generate(set: &RecommendationSet) -> RecommendationView {
        let max_total = set.scale.max_total();

        let cards = set
            .recommendations
            .iter()
            .enumerate()
            .map(|(idx, rec)| Self::card(idx + 1, rec, max_total))
            .collect();

        let notice = set.fallback.then(|| {
            "We could not tailor these suggestions to your garden, so here are measures that work almost everywhere.".to_string()
        });

        RecommendationView {
            scale: set.scale.tag().to_string(),
            max_total,
            notice,
            cards,
        }
    }

    /// One card, ranked 1-based
    pub fn card(rank: usize, rec: &RankedRecommendation, max_total: u32) -> MeasureCard {
        let measure = &rec.measure;
        let points = vec![
            PointLine {
                label: "Difficulty Points".to_string(),
                points: rec.points.difficulty,
                reasoning: reasoning_text(&rec.scores.difficulty_reasoning),
            },
            PointLine {
                label: "Impact Points".to_string(),
                points: rec.points.impact,
                reasoning: reasoning_text(&rec.scores.impact_reasoning),
            },
            PointLine {
                label: "Environment Points".to_string(),
                points: rec.points.environment,
                reasoning: reasoning_text(&rec.scores.environment_reasoning),
            },
        ];

        MeasureCard {
            rank,
            measure_id: measure.id,
            emoji: measure.emoji.clone(),
            title: measure.title.clone(),
            total_points: rec.total_score,
            progress: progress_percent(rec.total_score, max_total),
            points,
            description: measure.description.clone(),
            benefits: measure.benefits.clone(),
            implementation_tips: measure.implementation_tips.clone(),
        }
    }
}

/// Percentage of the maximum total, capped at 100
pub fn progress_percent(total: u32, max_total: u32) -> f64 {
    if max_total == 0 {
        return 0.0;
    }
    (total as f64 / max_total as f64 * 100.0).min(100.0)
}

fn reasoning_text(reasoning: &Option<String>) -> String {
    match reasoning.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => NO_REASONING.to_string(),
    }
}
