//! Utility modules for the recommendation pipeline
//!
//! - Normalization: raw answers to section-grouped observations

pub mod normalization;

// Re-export commonly used types
pub use normalization::{
    normalize, normalize_observation, normalize_with, Answer, NormalizedObservation, Observation,
};
