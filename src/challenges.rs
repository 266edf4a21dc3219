//! Challenges - commitments to implement recommended measures
//!
//! A challenge is created when a gardener accepts a ranked measure. The crate
//! only builds the records; persistence belongs to an external endpoint.

use crate::config::ChallengeConfig;
use crate::data::MeasureCatalog;
use crate::error::TransportError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Days a gardener has to complete an accepted challenge
pub const CHALLENGE_DURATION_DAYS: i64 = 14;

/// A measure the gardener committed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    pub measure_id: u32,
    pub total_score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRecord {
    pub measure_id: u32,
    pub total_score: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ChallengeRecord {
    pub fn new(measure_id: u32, total_score: u32, created_at: DateTime<Utc>) -> Self {
        Self {
            measure_id,
            total_score,
            created_at,
            expires_at: created_at + Duration::days(CHALLENGE_DURATION_DAYS),
        }
    }
}

/// Build records for accepted measures, all stamped with the same time
///
/// Returns the first measure id missing from the catalog as the error.
pub fn build_records(
    requests: &[ChallengeRequest],
    catalog: &MeasureCatalog,
    now: DateTime<Utc>,
) -> Result<Vec<ChallengeRecord>, u32> {
    requests
        .iter()
        .map(|req| {
            if catalog.contains(req.measure_id) {
                Ok(ChallengeRecord::new(req.measure_id, req.total_score, now))
            } else {
                Err(req.measure_id)
            }
        })
        .collect()
}

#[async_trait]
pub trait ChallengeRecorder: Send + Sync {
    async fn record(&self, records: &[ChallengeRecord]) -> Result<(), TransportError>;
}

/// Posts records as a JSON array to a configured endpoint
pub struct HttpChallengeRecorder {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpChallengeRecorder {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

#[async_trait]
impl ChallengeRecorder for HttpChallengeRecorder {
    async fn record(&self, records: &[ChallengeRecord]) -> Result<(), TransportError> {
        let mut request = self.http.post(&self.endpoint).json(records);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("Recorded {} challenges at {}", records.len(), self.endpoint);
        Ok(())
    }
}

/// Logs records instead of persisting them (no endpoint configured)
#[derive(Debug, Default)]
pub struct LoggingChallengeRecorder;

#[async_trait]
impl ChallengeRecorder for LoggingChallengeRecorder {
    async fn record(&self, records: &[ChallengeRecord]) -> Result<(), TransportError> {
        for record in records {
            tracing::info!(
                "Challenge accepted: measure {} (score {}), expires {}",
                record.measure_id,
                record.total_score,
                record.expires_at.to_rfc3339()
            );
        }
        Ok(())
    }
}

/// Pick the recorder for a configuration
pub fn recorder_from_config(
    config: &ChallengeConfig,
) -> Result<Arc<dyn ChallengeRecorder>, TransportError> {
    Ok(match &config.endpoint {
        Some(endpoint) => Arc::new(HttpChallengeRecorder::new(
            endpoint.clone(),
            config.api_key.clone(),
            config.timeout,
        )?),
        None => Arc::new(LoggingChallengeRecorder),
    })
}
