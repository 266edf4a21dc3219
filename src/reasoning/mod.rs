//! Reasoning service boundary
//!
//! The reasoning service is an external LLM endpoint: it receives a rendered
//! [`ScoringRequest`] and returns text that should contain JSON. Transport
//! failures are the only errors; interpreting the text is the validator's job.

pub mod openai;
pub mod rule_based;

use crate::error::TransportError;
use crate::prompt::ScoringRequest;
use async_trait::async_trait;

pub use openai::OpenAiClient;
pub use rule_based::RuleBasedService;

#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Send one request and return the raw reply text
    async fn complete(&self, request: &ScoringRequest) -> Result<String, TransportError>;

    /// Short name for logs
    fn name(&self) -> &str;
}
