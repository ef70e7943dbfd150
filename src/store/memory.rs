//! In-process TTL store.
//!
//! Backs all three store traits with one map. Used when the server runs
//! without external stores and in tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::{AnalyticsStore, CoverCache, ObjectBlob, ObjectStore};
use crate::error::CoverError;

#[derive(Debug, Clone)]
struct Entry {
    bytes: Bytes,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// Key/value store with optional per-entry expiry.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw read, `None` when absent or expired.
    pub async fn get_bytes(&self, key: &str) -> Option<Bytes> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.bytes.clone())
    }

    /// Raw write, overwriting any previous entry.
    pub async fn put_bytes(&self, key: &str, bytes: Bytes, ttl: Option<Duration>) {
        let entry = Entry {
            bytes,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CoverCache for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CoverError> {
        Ok(self.get_bytes(key).await)
    }

    async fn put(&self, key: &str, bytes: Bytes, ttl: Duration) -> Result<(), CoverError> {
        self.put_bytes(key, bytes, Some(ttl)).await;
        Ok(())
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CoverError> {
        match self.get_bytes(key).await {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| CoverError::Store(format!("non-UTF-8 value for {}: {}", key, e))),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CoverError> {
        self.put_bytes(key, Bytes::copy_from_slice(value.as_bytes()), ttl)
            .await;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<ObjectBlob>, CoverError> {
        Ok(self.get_bytes(path).await.map(|bytes| ObjectBlob {
            bytes,
            content_type: mime_guess::from_path(path).first().map(|m| m.to_string()),
        }))
    }
}
