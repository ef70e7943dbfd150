//! # External Stores
//!
//! The proxy keeps no state of its own between requests. Everything shared
//! lives behind three store interfaces:
//!
//! | Trait | Contract | Used for |
//! |-------|----------|----------|
//! | [`CoverCache`] | `get(key)`, `put(key, bytes, ttl)` | resolved cover bytes |
//! | [`ObjectStore`] | `get(path)` | pre-uploaded GBA covers |
//! | [`AnalyticsStore`] | `get(key)`, `put(key, value, ttl?)` | counters and visitor marks |
//!
//! A single `put` is atomic per key; there are no cross-key transactions.
//! Implementations report failures as [`CoverError::Store`]; the proxy
//! logs and swallows them.

pub mod fs;
pub mod memory;

pub use fs::DirObjectStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::error::CoverError;

/// Blob returned by an [`ObjectStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectBlob {
    pub bytes: Bytes,
    /// MIME type detected for the object, if the store knows it.
    pub content_type: Option<String>,
}

/// TTL cache of resolved cover bytes.
#[async_trait]
pub trait CoverCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CoverError>;

    async fn put(&self, key: &str, bytes: Bytes, ttl: Duration) -> Result<(), CoverError>;
}

/// Path-addressed blob storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<ObjectBlob>, CoverError>;
}

/// String key/value store holding counters as decimal strings.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CoverError>;

    /// Store `value`; `ttl = None` keeps it until overwritten.
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CoverError>;
}
