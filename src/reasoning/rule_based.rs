//! Offline rule-based reasoning service
//!
//! Used when no LLM is configured. Applies fixed questionnaire rules and
//! replies with a recommendations-only JSON object, so the rest of the
//! pipeline (validation, baseline scoring, ranking) runs unchanged.

use super::ReasoningService;
use crate::error::TransportError;
use crate::prompt::{ScoringRequest, UserContent};
use crate::utils::normalization::NormalizedObservation;
use async_trait::async_trait;
use serde_json::json;

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedService;

impl RuleBasedService {
    pub fn new() -> Self {
        Self
    }

    /// Measure ids suggested by the questionnaire rules, in rule order
    pub fn recommend(observation: &NormalizedObservation) -> Vec<u32> {
        let mut ids: Vec<u32> = Vec::new();
        let mut add = |id: u32| {
            if !ids.contains(&id) {
                ids.push(id);
            }
        };

        let is = |question: &str, value: &str| {
            observation
                .answer(question)
                .is_some_and(|a| a.includes(value))
        };

        if is("landSize", "small") || is("landSize", "medium") {
            add(15); // Bee Hotels
            add(14); // Birdhouses
        }

        if is("vegetationTypes", "lawn") {
            add(10); // Phased Mowing
        }

        // A missing answer counts as "no hedgehog house"
        if !is("wildlifeFeatures", "hedgehog_house") {
            add(1);
        }

        if is("waterFeatures", "no_water") {
            add(4); // Pond
            add(7); // Wadi & Flat Bank
        }

        if is("wildlifeBarriers", "many_barriers") {
            add(5); // Natural Boundaries
            add(11); // Permeable Surfaces
        }

        if is("aspectsToImprove", "plant_diversity") {
            add(2); // Plant Selection
            add(8); // Flower Strips
        }

        if is("aspectsToImprove", "wildlife_habitats") {
            add(9); // Wildlife Corners
            add(12); // Owl Nest Boxes
            add(13); // Bat Boxes
        }

        ids
    }
}

#[async_trait]
impl ReasoningService for RuleBasedService {
    async fn complete(&self, request: &ScoringRequest) -> Result<String, TransportError> {
        match &request.user {
            UserContent::Observation { observation, .. } => {
                let ids = Self::recommend(observation);
                Ok(json!({ "recommendations": ids }).to_string())
            }
            UserContent::Images(_) => Err(TransportError::NotConfigured(
                "image analysis needs a vision-capable reasoning service".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "rule-based"
    }
}
