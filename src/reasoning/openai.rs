//! OpenAI-compatible chat-completions client

use super::ReasoningService;
use crate::config::ReasoningConfig;
use crate::error::TransportError;
use crate::prompt::{RequestKind, ScoringRequest, UserContent};
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct OpenAiClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    vision_model: String,
    scoring_temperature: f64,
    image_temperature: f64,
}

impl OpenAiClient {
    pub fn new(config: &ReasoningConfig) -> Result<Self, TransportError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| TransportError::NotConfigured("OPENAI_API_KEY is not set".to_string()))?;

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            url: format!("{}/v1/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            vision_model: config.vision_model.clone(),
            scoring_temperature: config.scoring_temperature,
            image_temperature: config.image_temperature,
        })
    }

    /// Chat-completions request body for a scoring or image request
    pub fn request_body(&self, request: &ScoringRequest) -> Value {
        let user_content = match &request.user {
            UserContent::Observation { text, .. } => json!(text),
            UserContent::Images(urls) => Value::Array(
                urls.iter()
                    .map(|url| {
                        json!({
                            "type": "image_url",
                            "image_url": { "url": url, "detail": "high" }
                        })
                    })
                    .collect(),
            ),
        };

        let messages = json!([
            { "role": "system", "content": request.system },
            { "role": "user", "content": user_content },
        ]);

        match request.kind {
            RequestKind::Scoring => json!({
                "model": self.model,
                "messages": messages,
                "temperature": self.scoring_temperature,
            }),
            RequestKind::ImageAnalysis => json!({
                "model": self.vision_model,
                "messages": messages,
                "temperature": self.image_temperature,
                "response_format": { "type": "json_object" },
            }),
        }
    }
}

/// Pull `choices[0].message.content` out of a chat-completions reply
pub fn extract_content(reply: &Value) -> Option<&str> {
    reply
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c0| c0.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|x| x.as_str())
}

#[async_trait]
impl ReasoningService for OpenAiClient {
    async fn complete(&self, request: &ScoringRequest) -> Result<String, TransportError> {
        let body = self.request_body(request);
        tracing::debug!("Sending {:?} request to {}", request.kind, self.url);

        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: Value = resp.json().await?;
        let content = extract_content(&reply).ok_or(TransportError::EmptyReply)?;
        tracing::debug!("Reasoning service replied with {} bytes", content.len());

        Ok(content.to_string())
    }

    fn name(&self) -> &str {
        "openai"
    }
}
