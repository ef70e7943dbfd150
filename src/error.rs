//! # Error Types
//!
//! This module defines the error type shared by the extractor, the
//! transcoder and the cover proxy.

use axum::http::StatusCode;
use thiserror::Error;

use crate::rom::Platform;

/// Main error type for picocover operations
#[derive(Debug, Error)]
pub enum CoverError {
    /// ROM header is shorter than the platform's code offset + 4
    #[error("{platform} header too short: need {needed} bytes, got {actual}")]
    HeaderTooShort {
        platform: Platform,
        needed: usize,
        actual: usize,
    },

    /// Transcoder input could not be turned into a bitmap
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Malformed platform or game code
    #[error("{0}")]
    BadRequest(String),

    /// No cover in any source
    #[error("Cover not found for {} game", platform.tag().to_uppercase())]
    NotFound { platform: Platform, code: String },

    /// Stats token missing or mismatched
    #[error("Unauthorized")]
    Unauthorized,

    /// Stats requested without an analytics store attached
    #[error("Analytics not configured")]
    AnalyticsNotConfigured,

    /// A single upstream candidate failed (network, timeout, non-2xx)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Cache, object or analytics store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Server transport errors (bind, serve)
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoverError {
    /// HTTP status this error surfaces as.
    pub fn status(&self) -> StatusCode {
        match self {
            CoverError::BadRequest(_)
            | CoverError::HeaderTooShort { .. }
            | CoverError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            CoverError::NotFound { .. } => StatusCode::NOT_FOUND,
            CoverError::Unauthorized => StatusCode::UNAUTHORIZED,
            CoverError::AnalyticsNotConfigured => StatusCode::NOT_IMPLEMENTED,
            CoverError::Upstream(_)
            | CoverError::Store(_)
            | CoverError::Transport(_)
            | CoverError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body for the client. Internal failures get a generic message.
    pub fn body(&self) -> serde_json::Value {
        match self {
            CoverError::NotFound { platform, code } => serde_json::json!({
                "error": self.to_string(),
                "gameId": code,
                "platform": platform.tag(),
            }),
            e if e.status().is_server_error() && e.status() != StatusCode::NOT_IMPLEMENTED => {
                serde_json::json!({ "error": "Internal error" })
            }
            e => serde_json::json!({ "error": e.to_string() }),
        }
    }
}
