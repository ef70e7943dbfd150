//! Download statistics handler.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::error_response;
use crate::error::CoverError;
use crate::server::state::AppState;

/// Query parameters for the stats endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub token: Option<String>,
}

/// GET /stats - Download and unique-user counters.
pub async fn show(
    State(state): State<Arc<AppState>>,
    query: Result<Query<StatsQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => {
            return error_response(&CoverError::BadRequest(rejection.body_text()));
        }
    };
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match state.proxy.stats(query.token.as_deref(), authorization).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => error_response(&e),
    }
}
