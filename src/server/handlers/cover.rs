//! Cover lookup handlers.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderName, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::error_response;
use crate::proxy::{Handled, VisitorKey};
use crate::server::state::AppState;

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// GET /:platform/:code - Resolve a cover.
pub async fn by_code(
    State(state): State<Arc<AppState>>,
    Path((platform, code)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    respond(&state, Some(&platform), Some(&code), &headers).await
}

/// Every path without its own route. OPTIONS is still answered; anything
/// else is read as `/{platform}/{gameId}`, skipping empty segments and
/// ignoring trailing ones.
pub async fn fallback(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    let mut segments = uri.path().split('/').filter(|s| !s.is_empty());
    let platform = segments.next();
    let code = segments.next();
    respond(&state, platform, code, &headers).await
}

async fn respond(
    state: &AppState,
    platform: Option<&str>,
    code: Option<&str>,
    headers: &HeaderMap,
) -> Response {
    let visitor = VisitorKey::from_headers(headers);
    let Handled { result, deferred } = state.proxy.cover(platform, code, visitor).await;
    deferred.detach();

    match result {
        Ok(cover) => (
            [
                (header::CONTENT_TYPE, cover.content_type),
                (X_CACHE, cover.cache_state.as_str().to_string()),
            ],
            cover.bytes,
        )
            .into_response(),
        Err(e) => {
            if e.status().is_server_error() {
                warn!("Cover request failed: {}", e);
            } else {
                debug!("Cover request rejected: {}", e);
            }
            error_response(&e)
        }
    }
}
