//! # HTTP Server for Cover Lookups
//!
//! Serves the cover proxy over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! picocover serve --listen 0.0.0.0:8787 --covers-dir ./gba-covers
//! ```
//!
//! ## Routes
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | GET/HEAD | `/{nds\|gba}/{gameId}` | cover bytes, `X-Cache: HIT\|MISS\|OBJECT` |
//! | GET/HEAD | `/stats` | `{"downloadsTotal": n, "uniqueUsers": n}` |
//! | OPTIONS | any | 204 |
//!
//! Other paths are split into `/{platform}/{gameId}/...` with empty and
//! trailing segments ignored, so `/nds`, `/snes/ABCD` and `/` answer 400
//! while `/nds/ASME/extra` serves the cover. All responses carry
//! permissive CORS headers and `Cache-Control: public, max-age=<ttl>`.

mod handlers;
mod state;

pub use state::{AppState, DEFAULT_UPSTREAM_TIMEOUT, ServerConfig};

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, header},
    middleware,
    response::Response,
    routing::get,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::error::CoverError;

/// How often expired in-memory entries are swept.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Build the router around shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let max_age = state.proxy.config().cache_ttl.as_secs();

    Router::new()
        .route(
            "/stats",
            get(handlers::stats::show).options(handlers::preflight),
        )
        .route(
            "/:platform/:code",
            get(handlers::cover::by_code).options(handlers::preflight),
        )
        .fallback(handlers::cover::fallback)
        .with_state(state)
        .layer(middleware::map_response_with_state(max_age, apply_headers))
        .layer(TraceLayer::new_for_http())
}

/// CORS and caching headers on every response.
async fn apply_headers(State(max_age): State<u64>, mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, HEAD, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", max_age)) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    response
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use picocover::server::{ServerConfig, serve};
///
/// # async fn example() -> Result<(), picocover::CoverError> {
/// let config = ServerConfig {
///     listen_addr: "127.0.0.1:8787".to_string(),
///     ..ServerConfig::default()
/// };
///
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), CoverError> {
    let state = Arc::new(AppState::new(&config)?);

    // Spawn background store cleanup task
    tokio::spawn(cleanup_stores(state.clone()));

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            CoverError::Transport(format!("Failed to bind to {}: {}", config.listen_addr, e))
        })?;

    info!("picocover listening on {}", config.listen_addr);
    info!("Art host: {}", config.proxy.art_base_url);
    match &config.covers_dir {
        Some(dir) => info!("GBA covers: {}", dir.display()),
        None => info!("GBA covers: none (GBA lookups will 404)"),
    }

    axum::serve(listener, app)
        .await
        .map_err(|e| CoverError::Transport(format!("Server error: {}", e)))?;

    Ok(())
}

/// Background task to drop expired in-memory entries.
async fn cleanup_stores(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        interval.tick().await;
        for store in &state.memory_stores {
            let removed = store.purge_expired().await;
            if removed > 0 {
                debug!(
                    "Cleaned up {} expired entries ({} remaining)",
                    removed,
                    store.len().await
                );
            }
        }
    }
}
