//! Measure Scorer - ranking engine for scored recommendations
//!
//! Joins validated per-garden scores with the measure catalog, computes a
//! total per measure and produces a deterministic ranking.
//!
//! ```text
//! total_score        = difficulty_points + impact_points + environment_points
//! difficulty_points  = difficulty_score  | range_max - baseline_difficulty
//! impact_points      = impact_score      | baseline_impact
//! environment_points = environment_score | 0
//! ```
//!
//! Ordering: total descending, then measure id ascending.

use crate::data::{Measure, MeasureCatalog};
use crate::error::ResponseIssue;
use crate::validation::ValidatedResponse;
use serde::{Deserialize, Serialize};

/// Canonical score scale
///
/// Only the five-point scale exists. The tag travels in the scoring request
/// and in every result so a future scale change is explicit on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScoreScale {
    #[default]
    #[serde(rename = "five-point-v1")]
    FivePoint,
}

impl ScoreScale {
    pub const fn min(self) -> u8 {
        match self {
            ScoreScale::FivePoint => 1,
        }
    }

    pub const fn max(self) -> u8 {
        match self {
            ScoreScale::FivePoint => 5,
        }
    }

    pub const fn tag(self) -> &'static str {
        match self {
            ScoreScale::FivePoint => "five-point-v1",
        }
    }

    /// Highest possible total (three components at max)
    pub const fn max_total(self) -> u32 {
        3 * self.max() as u32
    }

    pub fn contains(self, value: u8) -> bool {
        (self.min()..=self.max()).contains(&value)
    }
}

/// Per-garden scores and reasoning for one recommended measure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredMeasure {
    pub measure_id: u32,
    #[serde(default)]
    pub environment_score: Option<u8>,
    #[serde(default)]
    pub difficulty_score: Option<u8>,
    #[serde(default)]
    pub impact_score: Option<u8>,
    #[serde(default)]
    pub environment_reasoning: Option<String>,
    #[serde(default)]
    pub difficulty_reasoning: Option<String>,
    #[serde(default)]
    pub impact_reasoning: Option<String>,
}

impl ScoredMeasure {
    /// Unscored entry (ranking falls back to catalog baselines)
    pub fn baseline(measure_id: u32) -> Self {
        Self {
            measure_id,
            ..Self::default()
        }
    }

    /// Same entry with out-of-scale scores removed
    pub fn within_scale(&self, scale: ScoreScale) -> Self {
        let keep = |score: Option<u8>| score.filter(|&s| scale.contains(s));
        Self {
            environment_score: keep(self.environment_score),
            difficulty_score: keep(self.difficulty_score),
            impact_score: keep(self.impact_score),
            ..self.clone()
        }
    }
}

/// Points awarded per component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointBreakdown {
    pub difficulty: u32,
    pub impact: u32,
    pub environment: u32,
}

impl PointBreakdown {
    pub fn total(&self) -> u32 {
        self.difficulty + self.impact + self.environment
    }
}

/// One ranked measure: catalog entry joined with its scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedRecommendation {
    pub measure: Measure,
    pub scores: ScoredMeasure,
    pub points: PointBreakdown,
    pub total_score: u32,
}

/// Ranked output of one analysis run
///
/// Replaced wholesale by the next analysis, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSet {
    pub scale: ScoreScale,
    pub catalog_version: String,
    /// True when the fixed default set was used instead of the service reply
    pub fallback: bool,
    pub recommendations: Vec<RankedRecommendation>,
    /// Problems absorbed while validating and ranking (observability only)
    pub issues: Vec<ResponseIssue>,
}

impl RecommendationSet {
    /// Rank a validated reply into a recommendation set
    ///
    /// If every recommended id is missing from the catalog, the default set is
    /// ranked instead so callers never receive an empty non-fallback result.
    pub fn from_validated(
        validated: ValidatedResponse,
        catalog: &MeasureCatalog,
        scale: ScoreScale,
    ) -> Self {
        let ValidatedResponse {
            measures,
            fallback,
            mut issues,
        } = validated;

        let (recommendations, mismatches) = rank_with_issues(&measures, catalog, scale);
        issues.extend(mismatches);

        if recommendations.is_empty() && !fallback {
            let mut set = Self::from_validated(
                ValidatedResponse::fallback(ResponseIssue::malformed(
                    "no recommended measure exists in the catalog",
                )),
                catalog,
                scale,
            );
            issues.append(&mut set.issues);
            set.issues = issues;
            return set;
        }

        Self {
            scale,
            catalog_version: catalog.version().to_string(),
            fallback,
            recommendations,
            issues,
        }
    }

    /// The ranked default set
    pub fn fallback(catalog: &MeasureCatalog, scale: ScoreScale, issue: ResponseIssue) -> Self {
        Self::from_validated(ValidatedResponse::fallback(issue), catalog, scale)
    }

    pub fn measure_ids(&self) -> Vec<u32> {
        self.recommendations.iter().map(|r| r.measure.id).collect()
    }
}

/// Compute the point breakdown for one measure
///
/// Scores outside the scale are treated as absent.
pub fn compute_points(measure: &Measure, scored: &ScoredMeasure, scale: ScoreScale) -> PointBreakdown {
    let in_scale = |score: Option<u8>| score.filter(|&s| scale.contains(s));

    let difficulty = match in_scale(scored.difficulty_score) {
        Some(score) => score as u32,
        None => scale.max().saturating_sub(measure.baseline_difficulty) as u32,
    };
    let impact = match in_scale(scored.impact_score) {
        Some(score) => score as u32,
        None => measure.baseline_impact as u32,
    };
    let environment = in_scale(scored.environment_score).map_or(0, |s| s as u32);

    PointBreakdown {
        difficulty,
        impact,
        environment,
    }
}

/// Rank scored measures against the catalog
pub fn rank(
    scored: &[ScoredMeasure],
    catalog: &MeasureCatalog,
    scale: ScoreScale,
) -> Vec<RankedRecommendation> {
    rank_with_issues(scored, catalog, scale).0
}

/// Rank scored measures, also returning the catalog mismatches that were dropped
pub fn rank_with_issues(
    scored: &[ScoredMeasure],
    catalog: &MeasureCatalog,
    scale: ScoreScale,
) -> (Vec<RankedRecommendation>, Vec<ResponseIssue>) {
    let mut issues = Vec::new();
    let mut ranked: Vec<RankedRecommendation> = Vec::with_capacity(scored.len());

    for entry in scored {
        let Some(measure) = catalog.get(entry.measure_id) else {
            tracing::warn!(
                "Dropping recommendation {}: no such measure in catalog {}",
                entry.measure_id,
                catalog.version()
            );
            issues.push(ResponseIssue::CatalogMismatch {
                measure_id: entry.measure_id,
            });
            continue;
        };

        let scores = entry.within_scale(scale);
        let points = compute_points(measure, &scores, scale);
        ranked.push(RankedRecommendation {
            measure: measure.clone(),
            scores,
            total_score: points.total(),
            points,
        });
    }

    ranked.sort_by(|a, b| {
        b.total_score
            .cmp(&a.total_score)
            .then_with(|| a.measure.id.cmp(&b.measure.id))
    });

    (ranked, issues)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: u32, env: u8, diff: u8, impact: u8) -> ScoredMeasure {
        ScoredMeasure {
            measure_id: id,
            environment_score: Some(env),
            difficulty_score: Some(diff),
            impact_score: Some(impact),
            ..ScoredMeasure::default()
        }
    }

    #[test]
    fn test_scale_bounds() {
        let scale = ScoreScale::FivePoint;
        assert!(scale.contains(1));
        assert!(scale.contains(5));
        assert!(!scale.contains(0));
        assert!(!scale.contains(6));
        assert_eq!(scale.max_total(), 15);
        assert_eq!(serde_json::to_string(&scale).unwrap(), "\"five-point-v1\"");
    }

    #[test]
    fn test_baseline_points() {
        let catalog = MeasureCatalog::builtin();
        // Hedgehog House: difficulty 2, impact 4
        let hedgehog = catalog.get(1).unwrap();
        let points = compute_points(hedgehog, &ScoredMeasure::baseline(1), ScoreScale::FivePoint);
        assert_eq!(points, PointBreakdown { difficulty: 3, impact: 4, environment: 0 });
        assert_eq!(points.total(), 7);
    }

    #[test]
    fn test_out_of_scale_scores_ignored() {
        let catalog = MeasureCatalog::builtin();
        let hedgehog = catalog.get(1).unwrap();
        let points = compute_points(hedgehog, &scored(1, 11, 0, 9), ScoreScale::FivePoint);
        assert_eq!(points, PointBreakdown { difficulty: 3, impact: 4, environment: 0 });
    }

    #[test]
    fn test_ranked_scores_omit_out_of_scale_values() {
        let catalog = MeasureCatalog::builtin();
        let ranked = rank(&[scored(1, 11, 3, 0)], &catalog, ScoreScale::FivePoint);

        assert_eq!(ranked[0].scores.environment_score, None);
        assert_eq!(ranked[0].scores.difficulty_score, Some(3));
        assert_eq!(ranked[0].scores.impact_score, None);
        assert_eq!(ranked[0].points.environment, 0);
    }

    #[test]
    fn test_ranks_by_total_descending() {
        let catalog = MeasureCatalog::builtin();
        let ranked = rank(
            &[scored(1, 4, 2, 4), scored(4, 5, 4, 5)],
            &catalog,
            ScoreScale::FivePoint,
        );

        let order: Vec<u32> = ranked.iter().map(|r| r.measure.id).collect();
        assert_eq!(order, vec![4, 1]);
        assert_eq!(ranked[0].total_score, 14);
        assert_eq!(ranked[1].total_score, 10);
    }

    #[test]
    fn test_ties_broken_by_measure_id() {
        let catalog = MeasureCatalog::builtin();
        let input = vec![scored(13, 3, 3, 3), scored(2, 3, 3, 3), scored(8, 3, 3, 3)];

        let first = rank(&input, &catalog, ScoreScale::FivePoint);
        let second = rank(&input, &catalog, ScoreScale::FivePoint);

        let order: Vec<u32> = first.iter().map(|r| r.measure.id).collect();
        assert_eq!(order, vec![2, 8, 13]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_set_from_fallback_uses_baselines() {
        let catalog = MeasureCatalog::builtin();
        let set = RecommendationSet::fallback(
            &catalog,
            ScoreScale::FivePoint,
            ResponseIssue::malformed("test"),
        );

        assert!(set.fallback);
        // Bee Hotels 3+5, then Hedgehog 3+4, Plant Selection 2+5, Flower Strips 3+4
        assert_eq!(set.measure_ids(), vec![15, 1, 2, 8]);
        assert_eq!(set.recommendations[0].total_score, 8);
        assert_eq!(set.catalog_version, "measures-v1");
    }

    #[test]
    fn test_set_with_no_catalog_matches_falls_back() {
        let measures = MeasureCatalog::builtin().measures()[..3].to_vec();
        let catalog = MeasureCatalog::from_measures("small", measures).unwrap();
        let validated = ValidatedResponse {
            measures: vec![ScoredMeasure::baseline(9)],
            fallback: false,
            issues: vec![],
        };

        let set = RecommendationSet::from_validated(validated, &catalog, ScoreScale::FivePoint);
        assert!(set.fallback);
        assert_eq!(set.measure_ids(), vec![1, 2]);
        assert_eq!(set.issues[0], ResponseIssue::CatalogMismatch { measure_id: 9 });
        assert!(set.issues.contains(&ResponseIssue::CatalogMismatch { measure_id: 15 }));
    }

    #[test]
    fn test_unknown_measure_dropped_with_issue() {
        let catalog = MeasureCatalog::builtin();
        let (ranked, issues) = rank_with_issues(
            &[scored(99, 5, 5, 5), ScoredMeasure::baseline(15)],
            &catalog,
            ScoreScale::FivePoint,
        );

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].measure.id, 15);
        assert_eq!(issues, vec![ResponseIssue::CatalogMismatch { measure_id: 99 }]);
    }
}
