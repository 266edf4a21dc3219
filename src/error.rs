//! Error Types
//!
//! Typed errors for the recommendation pipeline. Only transport failures leave
//! the analyzer as errors; malformed replies, bad fields and catalog
//! mismatches are absorbed and recorded as [`ResponseIssue`]s.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The reasoning service call itself failed
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("reasoning service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("reasoning service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("reasoning service reply carried no message content")]
    EmptyReply,

    #[error("reasoning service is not configured: {0}")]
    NotConfigured(String),
}

/// Catalog loading and integrity failures
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("measure id 0 is not allowed (ids start at 1)")]
    ZeroId,

    #[error("duplicate measure id {0}")]
    DuplicateId(u32),

    #[error("measure {id}: baseline {field} = {value} is outside 1..={max}")]
    BaselineOutOfRange {
        id: u32,
        field: &'static str,
        value: u8,
        max: u8,
    },

    #[error("catalog is empty")]
    Empty,
}

/// Invalid caller input on the image-derived path
#[derive(Debug, Error, PartialEq)]
pub enum ObservationError {
    #[error("no image URLs provided")]
    NoImages,

    #[error("invalid image URL '{url}': {reason}")]
    InvalidImageUrl { url: String, reason: String },
}

/// Something the validator or ranking engine absorbed instead of failing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ResponseIssue {
    /// Reply could not be parsed or had no usable recommendations
    MalformedResponse { detail: String },
    /// A single score/reasoning entry (or a whole mapping) was unusable
    PartialField { field: String, detail: String },
    /// A recommended id has no catalog entry
    CatalogMismatch { measure_id: u32 },
    /// The reasoning service could not be reached or answered with an error
    Transport { detail: String },
}

impl ResponseIssue {
    pub fn malformed(detail: impl Into<String>) -> Self {
        ResponseIssue::MalformedResponse { detail: detail.into() }
    }

    pub fn transport(error: &TransportError) -> Self {
        ResponseIssue::Transport {
            detail: error.to_string(),
        }
    }

    pub fn partial(field: &str, detail: impl Into<String>) -> Self {
        ResponseIssue::PartialField {
            field: field.to_string(),
            detail: detail.into(),
        }
    }
}
