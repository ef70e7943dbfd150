//! HTTP handlers for the server.

pub mod cover;
pub mod stats;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::CoverError;

/// JSON error body with the error's status.
pub(crate) fn error_response(err: &CoverError) -> Response {
    (err.status(), Json(err.body())).into_response()
}

/// OPTIONS on any route.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}
