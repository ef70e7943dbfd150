//! # HTTP Proxy Tests
//!
//! Drive the axum router end to end with in-process stores and a fake art
//! host. Background cache and analytics writes are detached by the HTTP
//! layer, so tests that observe them wait with [`drain`].

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use bytes::Bytes;
use picocover::error::CoverError;
use picocover::proxy::analytics::{DOWNLOADS_KEY, USERS_KEY};
use picocover::proxy::{CoverProxy, ProxyConfig, Upstream};
use picocover::server::{AppState, router};
use picocover::store::{AnalyticsStore, CoverCache, MemoryStore, ObjectBlob, ObjectStore};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

const BASE: &str = "https://art.gametdb.com";

/// Art host answering only the URLs it was given.
#[derive(Default)]
struct FakeArtHost {
    covers: Vec<(String, Bytes)>,
    requested: Mutex<Vec<String>>,
}

impl FakeArtHost {
    fn with_cover(mut self, region: &str, code: &str, body: &'static [u8]) -> Self {
        self.covers.push((
            format!("{}/ds/cover/{}/{}.jpg", BASE, region, code),
            Bytes::from_static(body),
        ));
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl Upstream for FakeArtHost {
    async fn fetch(&self, url: &str) -> Result<Bytes, CoverError> {
        self.requested.lock().unwrap().push(url.to_string());
        self.covers
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| CoverError::Upstream(format!("{}: HTTP 404", url)))
    }
}

/// MemoryStore that counts every access and can be switched to fail.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    gets: AtomicUsize,
    puts: AtomicUsize,
    broken: bool,
}

impl CountingStore {
    fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    fn accesses(&self) -> usize {
        self.gets.load(Ordering::SeqCst) + self.puts.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), CoverError> {
        if self.broken {
            Err(CoverError::Store("store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CoverCache for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CoverError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        CoverCache::get(&self.inner, key).await
    }

    async fn put(&self, key: &str, bytes: Bytes, ttl: Duration) -> Result<(), CoverError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        CoverCache::put(&self.inner, key, bytes, ttl).await
    }
}

#[async_trait]
impl AnalyticsStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CoverError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        AnalyticsStore::get(&self.inner, key).await
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CoverError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        AnalyticsStore::put(&self.inner, key, value, ttl).await
    }
}

#[async_trait]
impl ObjectStore for CountingStore {
    async fn get(&self, path: &str) -> Result<Option<ObjectBlob>, CoverError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        ObjectStore::get(&self.inner, path).await
    }
}

fn app(proxy: CoverProxy) -> Router {
    router(Arc::new(AppState::from_proxy(proxy)))
}

async fn send(app: &Router, method: Method, uri: &str, headers: &[(&str, &str)]) -> Response {
    let mut request = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn get(app: &Router, uri: &str) -> Response {
    send(app, Method::GET, uri, &[]).await
}

async fn body_bytes(response: Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn header_str<'a>(response: &'a Response, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Let detached background tasks run to completion.
async fn drain() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_invalid_platform_touches_no_store() {
    let cache = Arc::new(CountingStore::default());
    let analytics = Arc::new(CountingStore::default());
    let host = Arc::new(FakeArtHost::default());
    let app = app(
        CoverProxy::new(ProxyConfig::default(), host.clone())
            .with_cache(cache.clone())
            .with_analytics(analytics.clone()),
    );

    let response = get(&app, "/snes/ABCD").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("Invalid platform"));

    drain().await;
    assert_eq!(cache.accesses(), 0);
    assert_eq!(analytics.accesses(), 0);
    assert!(host.requested().is_empty());
}

#[tokio::test]
async fn test_malformed_codes_touch_no_store() {
    let cache = Arc::new(CountingStore::default());
    let objects = Arc::new(CountingStore::default());
    let analytics = Arc::new(CountingStore::default());
    let host = Arc::new(FakeArtHost::default());
    let app = app(
        CoverProxy::new(ProxyConfig::default(), host.clone())
            .with_cache(cache.clone())
            .with_objects(objects.clone())
            .with_analytics(analytics.clone()),
    );

    for (uri, message) in [
        ("/nds", "gameId is required"),
        ("/nds/ABC", "Invalid gameId. Must be exactly 4 characters."),
        ("/gba/ABCDE", "Invalid gameId. Must be exactly 4 characters."),
        ("/nds/AB-D", "Invalid gameId. Must be alphanumeric."),
    ] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body_json(response).await["error"], message, "{}", uri);
    }

    drain().await;
    assert_eq!(cache.accesses(), 0);
    assert_eq!(objects.accesses(), 0);
    assert_eq!(analytics.accesses(), 0);
    assert!(host.requested().is_empty());
}

#[tokio::test]
async fn test_unknown_routes_are_invalid_platform() {
    let app = app(CoverProxy::new(
        ProxyConfig::default(),
        Arc::new(FakeArtHost::default()),
    ));

    for uri in ["/", "/snes", "/favicon.ico"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("Invalid platform"));
    }
}

#[tokio::test]
async fn test_extra_and_empty_segments_are_ignored() {
    let host = Arc::new(FakeArtHost::default().with_cover("EN", "ASME", b"cover"));
    let app = app(CoverProxy::new(ProxyConfig::default(), host));

    for uri in ["/nds/ASME/extra", "/nds/ASME/", "//nds//asme"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        assert_eq!(body_bytes(response).await, Bytes::from_static(b"cover"));
    }
}

#[tokio::test]
async fn test_miss_then_hit() {
    let cache = Arc::new(CountingStore::default());
    let host = Arc::new(FakeArtHost::default().with_cover("US", "ASME", b"mario-kart"));
    let app = app(CoverProxy::new(ProxyConfig::default(), host.clone()).with_cache(cache.clone()));

    let first = get(&app, "/nds/ASME").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(header_str(&first, "x-cache"), "MISS");
    assert_eq!(header_str(&first, "content-type"), "image/jpeg");
    assert_eq!(body_bytes(first).await, Bytes::from_static(b"mario-kart"));

    drain().await;
    assert_eq!(cache.puts.load(Ordering::SeqCst), 1);

    let second = get(&app, "/nds/ASME").await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(header_str(&second, "x-cache"), "HIT");
    assert_eq!(body_bytes(second).await, Bytes::from_static(b"mario-kart"));

    // EN then US for the miss, nothing for the hit
    assert_eq!(host.requested().len(), 2);
}

#[tokio::test]
async fn test_lowercase_code_is_uppercased() {
    let host = Arc::new(FakeArtHost::default().with_cover("EN", "ASME", b"cover"));
    let app = app(CoverProxy::new(ProxyConfig::default(), host.clone()));

    let response = get(&app, "/NDS/asme").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        host.requested(),
        vec![format!("{}/ds/cover/EN/ASME.jpg", BASE)]
    );
}

#[tokio::test]
async fn test_upstream_failures_fall_through_regions() {
    let host = Arc::new(FakeArtHost::default().with_cover("JA", "YKWJ", b"japan-only"));
    let app = app(CoverProxy::new(ProxyConfig::default(), host.clone()));

    let response = get(&app, "/nds/YKWJ").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, Bytes::from_static(b"japan-only"));
    assert_eq!(
        host.requested(),
        ["EN", "US", "EU", "JA"]
            .iter()
            .map(|r| format!("{}/ds/cover/{}/YKWJ.jpg", BASE, r))
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_not_found_names_the_code() {
    let app = app(CoverProxy::new(
        ProxyConfig::default(),
        Arc::new(FakeArtHost::default()),
    ));

    let response = get(&app, "/nds/XXXX").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("not found"));
    assert_eq!(body["gameId"], "XXXX");
}

#[tokio::test]
async fn test_gba_object_store_hit() {
    let objects = Arc::new(MemoryStore::new());
    objects
        .put_bytes("gba/BPEE.png", Bytes::from_static(b"\x89PNG-emerald"), None)
        .await;
    let cache = Arc::new(CountingStore::default());
    let host = Arc::new(FakeArtHost::default());
    let app = app(
        CoverProxy::new(ProxyConfig::default(), host.clone())
            .with_cache(cache.clone())
            .with_objects(objects),
    );

    let response = get(&app, "/gba/bpee").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-cache"), "OBJECT");
    assert_eq!(header_str(&response, "content-type"), "image/png");
    assert_eq!(
        body_bytes(response).await,
        Bytes::from_static(b"\x89PNG-emerald")
    );

    drain().await;
    assert_eq!(cache.puts.load(Ordering::SeqCst), 0);
    assert!(host.requested().is_empty());
}

#[tokio::test]
async fn test_broken_stores_still_serve() {
    let cache = Arc::new(CountingStore::broken());
    let analytics = Arc::new(CountingStore::broken());
    let host = Arc::new(FakeArtHost::default().with_cover("EN", "ASME", b"cover"));
    let app = app(
        CoverProxy::new(ProxyConfig::default(), host)
            .with_cache(cache.clone())
            .with_analytics(analytics.clone()),
    );

    let response = get(&app, "/nds/ASME").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-cache"), "MISS");

    drain().await;
    assert!(cache.accesses() >= 2);
    assert!(analytics.accesses() >= 1);
}

#[tokio::test]
async fn test_stats_requires_token() {
    let analytics = Arc::new(CountingStore::default());
    AnalyticsStore::put(&analytics.inner, DOWNLOADS_KEY, "12", None)
        .await
        .unwrap();
    AnalyticsStore::put(&analytics.inner, USERS_KEY, "3", None)
        .await
        .unwrap();
    let config = ProxyConfig {
        stats_token: Some("s3cret".to_string()),
        ..ProxyConfig::default()
    };
    let app = app(
        CoverProxy::new(config, Arc::new(FakeArtHost::default())).with_analytics(analytics.clone()),
    );

    let response = get(&app, "/stats").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = get(&app, "/stats?token=wrong").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(analytics.accesses(), 0);

    let response = get(&app, "/stats?token=s3cret").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({"downloadsTotal": 12, "uniqueUsers": 3})
    );

    let response = send(
        &app,
        Method::GET,
        "/stats",
        &[("authorization", "Bearer s3cret")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_stats_query_is_json() {
    let analytics = Arc::new(CountingStore::default());
    let app = app(
        CoverProxy::new(ProxyConfig::default(), Arc::new(FakeArtHost::default()))
            .with_analytics(analytics.clone()),
    );

    let response = get(&app, "/stats?token=a&token=b").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(header_str(&response, "content-type"), "application/json");
    assert!(body_json(response).await["error"].is_string());
    assert_eq!(analytics.accesses(), 0);
}

#[tokio::test]
async fn test_stats_without_analytics_is_501() {
    let app = app(CoverProxy::new(
        ProxyConfig::default(),
        Arc::new(FakeArtHost::default()),
    ));

    let response = get(&app, "/stats").await;
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({"error": "Analytics not configured"})
    );
}

#[tokio::test]
async fn test_same_visitor_counted_once() {
    let analytics = Arc::new(MemoryStore::new());
    let host = Arc::new(FakeArtHost::default().with_cover("EN", "ASME", b"cover"));
    let app = app(CoverProxy::new(ProxyConfig::default(), host).with_analytics(analytics.clone()));

    let visitor = [("x-forwarded-for", "203.0.113.7"), ("user-agent", "launcher/1.0")];
    for _ in 0..2 {
        let response = send(&app, Method::GET, "/nds/ASME", &visitor).await;
        assert_eq!(response.status(), StatusCode::OK);
        drain().await;
    }
    let other = [("x-forwarded-for", "198.51.100.1"), ("user-agent", "launcher/1.0")];
    send(&app, Method::GET, "/nds/ASME", &other).await;
    drain().await;

    let stats = body_json(get(&app, "/stats").await).await;
    assert_eq!(
        stats,
        serde_json::json!({"downloadsTotal": 3, "uniqueUsers": 2})
    );
}

#[tokio::test]
async fn test_failed_lookups_are_not_counted() {
    let analytics = Arc::new(MemoryStore::new());
    let app = app(
        CoverProxy::new(ProxyConfig::default(), Arc::new(FakeArtHost::default()))
            .with_analytics(analytics),
    );

    get(&app, "/nds/XXXX").await;
    get(&app, "/nds/A").await;
    drain().await;

    let stats = body_json(get(&app, "/stats").await).await;
    assert_eq!(stats["downloadsTotal"], 0);
}

#[tokio::test]
async fn test_cors_and_cache_control_on_every_response() {
    let host = Arc::new(FakeArtHost::default().with_cover("EN", "ASME", b"cover"));
    let app = app(CoverProxy::new(ProxyConfig::default(), host));

    for uri in ["/nds/ASME", "/nds/XXXX", "/snes/ABCD"] {
        let response = get(&app, uri).await;
        assert_eq!(
            header_str(&response, "access-control-allow-origin"),
            "*",
            "{}",
            uri
        );
        assert_eq!(
            header_str(&response, "access-control-allow-methods"),
            "GET, HEAD, OPTIONS"
        );
        assert_eq!(
            header_str(&response, header::CACHE_CONTROL.as_str()),
            "public, max-age=2628000"
        );
    }
}

#[tokio::test]
async fn test_options_preflight() {
    let app = app(CoverProxy::new(
        ProxyConfig::default(),
        Arc::new(FakeArtHost::default()),
    ));

    for uri in ["/nds/ASME", "/stats", "/anything/at/all"] {
        let response = send(&app, Method::OPTIONS, uri, &[]).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT, "{}", uri);
        assert_eq!(header_str(&response, "access-control-allow-origin"), "*");
    }
}

#[tokio::test]
async fn test_head_returns_headers_only() {
    let host = Arc::new(FakeArtHost::default().with_cover("EN", "ASME", b"cover"));
    let app = app(CoverProxy::new(ProxyConfig::default(), host));

    let response = send(&app, Method::HEAD, "/nds/ASME", &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-cache"), "MISS");
    assert!(body_bytes(response).await.is_empty());
}
