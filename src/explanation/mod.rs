//! Presentation adapter: ranked measures as renderable cards

pub mod types;
pub mod generator;
pub mod formatters;

pub use types::{MeasureCard, PointLine, RecommendationView, NO_REASONING};
pub use generator::{progress_percent, ExplanationGenerator};
pub use formatters::{JsonFormatter, JsonLayout, MarkdownFormatter};
