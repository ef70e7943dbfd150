//! # Cover Resolution Proxy
//!
//! Maps `(platform, code)` to cover bytes.
//!
//! ## Request Flow
//!
//! ```text
//! validate ──bad──► 400
//!    │
//! cover cache ──hit──► HIT
//!    │ miss
//!    ├─ NDS: art host, one URL per region ──first 2xx──► cache write ─► MISS
//!    ├─ GBA: object store, per extension/prefix ──found──► OBJECT
//!    ├─ GBA: fallback source (if attached) ──found──► cache write ─► MISS
//!    │
//!    └──────────────────────────────────────────────────────► 404
//! ```
//!
//! Every success also records analytics. Cache writes and analytics run
//! as [`Deferred`] background tasks and never delay or fail the response.
//! Store errors are logged and treated as misses; upstream errors just
//! advance to the next candidate.
//!
//! The proxy itself holds no mutable state. Concurrent misses for the same
//! key may both fetch and both write the cache; the last write wins.

pub mod analytics;
pub mod candidates;
pub mod deferred;
pub mod request;
pub mod upstream;

pub use analytics::{Stats, VisitorKey};
pub use candidates::Candidate;
pub use deferred::Deferred;
pub use request::CoverRequest;
pub use upstream::{FallbackSource, HttpUpstream, Upstream};

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::CoverError;
use crate::rom::Platform;
use crate::store::{AnalyticsStore, CoverCache, ObjectStore};

/// Cover cache TTL (30 days + 10 hours).
pub const CACHE_TTL: Duration = Duration::from_secs(2_628_000);

/// How long a visitor counts as already seen (30 days).
pub const ANALYTICS_TTL: Duration = Duration::from_secs(2_592_000);

/// Default art host.
pub const DEFAULT_ART_BASE_URL: &str = "https://art.gametdb.com";

/// Content type for cache hits and art host covers.
pub const JPEG: &str = "image/jpeg";

/// Proxy settings.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Base URL of the art host, without trailing slash.
    pub art_base_url: String,
    /// Region tags tried in order.
    pub regions: Vec<String>,
    /// Cover cache TTL; also advertised as `max-age`.
    pub cache_ttl: Duration,
    /// Unique-visitor retention window.
    pub analytics_ttl: Duration,
    /// Shared token guarding `/stats`; `None` leaves it open.
    pub stats_token: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            art_base_url: DEFAULT_ART_BASE_URL.to_string(),
            regions: candidates::REGIONS.iter().map(|r| r.to_string()).collect(),
            cache_ttl: CACHE_TTL,
            analytics_ttl: ANALYTICS_TTL,
            stats_token: None,
        }
    }
}

/// Where the cover bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Served from the cover cache.
    Hit,
    /// Fetched fresh and written to the cache.
    Miss,
    /// Read from the object store; not cached.
    Object,
}

impl CacheState {
    /// `X-Cache` header value.
    pub fn as_str(self) -> &'static str {
        match self {
            CacheState::Hit => "HIT",
            CacheState::Miss => "MISS",
            CacheState::Object => "OBJECT",
        }
    }
}

/// A resolved cover.
#[derive(Debug, Clone, PartialEq)]
pub struct Cover {
    pub bytes: Bytes,
    pub content_type: String,
    pub cache_state: CacheState,
}

/// Result of a proxy call plus the background work it started.
#[derive(Debug)]
pub struct Handled<T> {
    pub result: Result<T, CoverError>,
    pub deferred: Deferred,
}

/// The cover resolution proxy.
///
/// Stores are optional: without a cache every request goes upstream,
/// without an object store GBA lookups find nothing, without analytics
/// nothing is counted and `/stats` reports 501.
pub struct CoverProxy {
    config: ProxyConfig,
    upstream: Arc<dyn Upstream>,
    cache: Option<Arc<dyn CoverCache>>,
    objects: Option<Arc<dyn ObjectStore>>,
    analytics: Option<Arc<dyn AnalyticsStore>>,
    fallback: Option<Arc<dyn FallbackSource>>,
}

impl CoverProxy {
    pub fn new(config: ProxyConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            config,
            upstream,
            cache: None,
            objects: None,
            analytics: None,
            fallback: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CoverCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_objects(mut self, objects: Arc<dyn ObjectStore>) -> Self {
        self.objects = Some(objects);
        self
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsStore>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackSource>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Resolve a cover from raw route segments.
    pub async fn cover(
        &self,
        platform: Option<&str>,
        code: Option<&str>,
        visitor: Option<VisitorKey>,
    ) -> Handled<Cover> {
        let mut deferred = Deferred::new();
        let result = match CoverRequest::parse(platform, code) {
            Ok(request) => self.resolve(&request, visitor, &mut deferred).await,
            Err(e) => Err(e),
        };
        Handled { result, deferred }
    }

    /// Resolve a validated request.
    pub async fn resolve(
        &self,
        request: &CoverRequest,
        visitor: Option<VisitorKey>,
        deferred: &mut Deferred,
    ) -> Result<Cover, CoverError> {
        let key = request.cache_key();

        if let Some(bytes) = self.cached(&key).await {
            debug!("Cache hit for {}", key);
            self.track(visitor, deferred);
            return Ok(Cover {
                bytes,
                content_type: JPEG.to_string(),
                cache_state: CacheState::Hit,
            });
        }

        for candidate in candidates::candidates(&self.config, request) {
            match candidate {
                Candidate::Upstream { region, url } => match self.upstream.fetch(&url).await {
                    Ok(bytes) => {
                        info!("Fetched {} from region {}", key, region);
                        return Ok(self.fresh(key, bytes, visitor, deferred));
                    }
                    Err(e) => debug!("{}", e),
                },
                Candidate::Object { path, content_type } => {
                    let Some(objects) = &self.objects else {
                        break;
                    };
                    match objects.get(&path).await {
                        Ok(Some(blob)) => {
                            info!("Object store hit for {}", path);
                            self.track(visitor, deferred);
                            return Ok(Cover {
                                bytes: blob.bytes,
                                content_type: blob
                                    .content_type
                                    .unwrap_or_else(|| content_type.to_string()),
                                cache_state: CacheState::Object,
                            });
                        }
                        Ok(None) => {}
                        Err(e) => warn!("Object lookup failed for {}: {}", path, e),
                    }
                }
            }
        }

        let fallback = self
            .fallback
            .as_ref()
            .filter(|_| request.platform() == Platform::Gba);
        if let Some(fallback) = fallback {
            match fallback.fetch(request).await {
                Ok(Some(bytes)) => {
                    info!("Fallback source hit for {}", key);
                    return Ok(self.fresh(key, bytes, visitor, deferred));
                }
                Ok(None) => {}
                Err(e) => warn!("Fallback source failed for {}: {}", key, e),
            }
        }

        Err(CoverError::NotFound {
            platform: request.platform(),
            code: request.code().to_string(),
        })
    }

    /// Answer `/stats`.
    ///
    /// The token may come from the `token` query parameter or an
    /// `Authorization: Bearer` header.
    pub async fn stats(
        &self,
        query_token: Option<&str>,
        authorization: Option<&str>,
    ) -> Result<Stats, CoverError> {
        let Some(analytics) = &self.analytics else {
            return Err(CoverError::AnalyticsNotConfigured);
        };

        if let Some(expected) = &self.config.stats_token {
            let presented = query_token
                .filter(|t| !t.is_empty())
                .or_else(|| authorization.map(strip_bearer));
            if presented != Some(expected.as_str()) {
                return Err(CoverError::Unauthorized);
            }
        }

        match analytics::read_stats(analytics.as_ref()).await {
            Ok(stats) => Ok(stats),
            Err(e) => {
                warn!("Failed to read stats: {}", e);
                Ok(Stats::default())
            }
        }
    }

    async fn cached(&self, key: &str) -> Option<Bytes> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!("Cache lookup failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Fresh bytes: schedule the cache write and analytics, tag `MISS`.
    fn fresh(
        &self,
        key: String,
        bytes: Bytes,
        visitor: Option<VisitorKey>,
        deferred: &mut Deferred,
    ) -> Cover {
        if let Some(cache) = &self.cache {
            let cache = cache.clone();
            let value = bytes.clone();
            let ttl = self.config.cache_ttl;
            deferred.spawn(async move {
                if let Err(e) = cache.put(&key, value, ttl).await {
                    warn!("Cache write failed for {}: {}", key, e);
                }
            });
        }
        self.track(visitor, deferred);
        Cover {
            bytes,
            content_type: JPEG.to_string(),
            cache_state: CacheState::Miss,
        }
    }

    fn track(&self, visitor: Option<VisitorKey>, deferred: &mut Deferred) {
        let Some(analytics) = &self.analytics else {
            return;
        };
        let analytics = analytics.clone();
        let retention = self.config.analytics_ttl;
        deferred.spawn(async move {
            if let Err(e) =
                analytics::record_download(analytics.as_ref(), visitor.as_ref(), retention).await
            {
                warn!("Analytics update failed: {}", e);
            }
        });
    }
}

/// `Bearer <token>` → `<token>`, case-insensitive; other values pass through.
fn strip_bearer(header: &str) -> &str {
    let header = header.trim();
    match header.get(..6) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => header[6..].trim_start(),
        _ => header,
    }
}
