//! Server state and configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::CoverError;
use crate::proxy::{CoverProxy, HttpUpstream, ProxyConfig};
use crate::store::{DirObjectStore, MemoryStore};

/// Default per-request timeout for the art host.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(15);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8787")
    pub listen_addr: String,
    pub proxy: ProxyConfig,
    /// Directory served as the GBA object store
    pub covers_dir: Option<PathBuf>,
    pub upstream_timeout: Duration,
    /// Keep resolved covers in an in-memory cache
    pub cache: bool,
    /// Count downloads in an in-memory analytics store
    pub analytics: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8787".to_string(),
            proxy: ProxyConfig::default(),
            covers_dir: None,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            cache: true,
            analytics: true,
        }
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub proxy: CoverProxy,
    /// In-process stores owned by the server, swept by the cleanup task.
    pub memory_stores: Vec<Arc<MemoryStore>>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Result<Self, CoverError> {
        let upstream = Arc::new(HttpUpstream::new(config.upstream_timeout)?);
        let mut proxy = CoverProxy::new(config.proxy.clone(), upstream);
        let mut memory_stores = Vec::new();

        if config.cache {
            let cache = Arc::new(MemoryStore::new());
            proxy = proxy.with_cache(cache.clone());
            memory_stores.push(cache);
        }
        if config.analytics {
            let analytics = Arc::new(MemoryStore::new());
            proxy = proxy.with_analytics(analytics.clone());
            memory_stores.push(analytics);
        }
        if let Some(dir) = &config.covers_dir {
            proxy = proxy.with_objects(Arc::new(DirObjectStore::new(dir.clone())));
        }

        Ok(Self {
            proxy,
            memory_stores,
        })
    }

    /// State around a prebuilt proxy, with no server-owned stores.
    pub fn from_proxy(proxy: CoverProxy) -> Self {
        Self {
            proxy,
            memory_stores: Vec::new(),
        }
    }
}
