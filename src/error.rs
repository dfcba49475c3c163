//! Error types for the extraction pipeline.
//!
//! Three layers, matching how far a failure is allowed to travel:
//!
//! - [`FetchError`]: transport or HTTP status failures. Fatal when raised by
//!   the primary page fetch, swallowed when raised by a secondary lookup.
//! - [`DecodeError`]: an embedded-state span was found but could not be
//!   decoded. Never crosses the extractor boundary.
//! - [`ParseError`]: the reason attached to a failed [`ParseOutcome`](crate::ParseOutcome).

use reqwest::StatusCode;
use thiserror::Error;

/// Network-level failures.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("failed to read body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Failures while turning a raw state span into a JSON tree.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("percent-decoding failed: {0}")]
    Percent(#[from] std::string::FromUtf8Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a parse did not produce a record.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("unrecognized platform: {0}")]
    UnrecognizedPlatform(String),

    #[error("network error: {0}")]
    Network(#[from] FetchError),

    #[error("no usable metadata found at {0}")]
    ExtractionFailed(String),
}

impl ParseError {
    /// Short machine-readable kind, used in CLI output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::UnrecognizedPlatform(_) => "unrecognized_platform",
            ParseError::Network(_) => "network_error",
            ParseError::ExtractionFailed(_) => "extraction_failed",
        }
    }
}
