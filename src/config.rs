//! Service Configuration
//!
//! Everything is read from environment variables once at startup. Unset
//! variables fall back to local-development defaults.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CHALLENGE_TIMEOUT_SECS: u64 = 10;

/// Reasoning service connection settings
#[derive(Debug, Clone)]
pub struct ReasoningConfig {
    pub base_url: String,
    /// No key means the offline rule-based service is used
    pub api_key: Option<String>,
    pub model: String,
    pub vision_model: String,
    pub timeout: Duration,
    pub scoring_temperature: f64,
    pub image_temperature: f64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            scoring_temperature: 0.7,
            image_temperature: 0.3,
        }
    }
}

/// External challenge-record endpoint
#[derive(Debug, Clone)]
pub struct ChallengeConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_CHALLENGE_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub catalog_path: Option<PathBuf>,
    pub reasoning: ReasoningConfig,
    pub challenges: ChallengeConfig,
}

impl ServiceConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid PORT: {}", raw))?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match get("REASONING_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid REASONING_TIMEOUT_SECS: {}", raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let challenge_timeout_secs = match get("CHALLENGE_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid CHALLENGE_TIMEOUT_SECS: {}", raw))?,
            None => DEFAULT_CHALLENGE_TIMEOUT_SECS,
        };

        let defaults = ReasoningConfig::default();
        let reasoning = ReasoningConfig {
            base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            api_key: get("OPENAI_API_KEY"),
            model: get("OPENAI_MODEL").unwrap_or(defaults.model),
            vision_model: get("OPENAI_VISION_MODEL").unwrap_or(defaults.vision_model),
            timeout: Duration::from_secs(timeout_secs),
            ..defaults
        };

        Ok(Self {
            port,
            catalog_path: get("CATALOG_PATH").map(PathBuf::from),
            reasoning,
            challenges: ChallengeConfig {
                endpoint: get("CHALLENGE_ENDPOINT"),
                api_key: get("CHALLENGE_API_KEY"),
                timeout: Duration::from_secs(challenge_timeout_secs),
            },
        })
    }

    /// Log the effective configuration (secrets redacted)
    pub fn log_summary(&self) {
        tracing::info!("Configuration:");
        tracing::info!("  PORT: {}", self.port);
        tracing::info!(
            "  CATALOG_PATH: {}",
            self.catalog_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<builtin>".to_string())
        );
        tracing::info!("  OPENAI_BASE_URL: {}", self.reasoning.base_url);
        tracing::info!(
            "  OPENAI_API_KEY: {}",
            if self.reasoning.api_key.is_some() { "<set>" } else { "<unset, rule-based mode>" }
        );
        tracing::info!("  OPENAI_MODEL: {}", self.reasoning.model);
        tracing::info!("  OPENAI_VISION_MODEL: {}", self.reasoning.vision_model);
        tracing::info!("  REASONING_TIMEOUT_SECS: {}", self.reasoning.timeout.as_secs());
        tracing::info!(
            "  CHALLENGE_ENDPOINT: {}",
            self.challenges.endpoint.as_deref().unwrap_or("<unset, log only>")
        );
        tracing::info!("  CHALLENGE_TIMEOUT_SECS: {}", self.challenges.timeout.as_secs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.catalog_path.is_none());
        assert!(config.reasoning.api_key.is_none());
        assert_eq!(config.reasoning.model, DEFAULT_MODEL);
        assert_eq!(config.reasoning.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(config.challenges.endpoint.is_none());
        assert_eq!(
            config.challenges.timeout,
            Duration::from_secs(DEFAULT_CHALLENGE_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_overrides() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("PORT", "8081"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-test"),
            ("REASONING_TIMEOUT_SECS", "5"),
            ("CATALOG_PATH", "/etc/measures.json"),
            ("CHALLENGE_ENDPOINT", "https://records.example.org/challenges"),
            ("CHALLENGE_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8081);
        assert_eq!(config.reasoning.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.reasoning.model, "gpt-test");
        assert_eq!(config.reasoning.vision_model, DEFAULT_VISION_MODEL);
        assert_eq!(config.reasoning.timeout, Duration::from_secs(5));
        assert_eq!(config.catalog_path, Some(PathBuf::from("/etc/measures.json")));
        assert!(config.challenges.endpoint.is_some());
        assert_eq!(config.challenges.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = ServiceConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "  ")])).unwrap();
        assert!(config.reasoning.api_key.is_none());
    }

    #[test]
    fn test_invalid_port_rejected() {
        let err = ServiceConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("Invalid PORT"));
    }
}
