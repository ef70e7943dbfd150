//! Download and unique-visitor counters.
//!
//! Counters live in the analytics store as decimal strings:
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `stats:downloads:total` | successful cover responses |
//! | `stats:users:total` | distinct visitors seen |
//! | `stats:users:unique:<sha256>` | visitor mark, expires after the retention window |
//!
//! A visitor is the SHA-256 of `"{ip}|{user_agent}"`; raw addresses are
//! never stored.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::error::CoverError;
use crate::store::AnalyticsStore;

pub const DOWNLOADS_KEY: &str = "stats:downloads:total";
pub const USERS_KEY: &str = "stats:users:total";
pub const UNIQUE_PREFIX: &str = "stats:users:unique:";

/// Hashed visitor identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VisitorKey(String);

impl VisitorKey {
    /// `None` when both parts are empty.
    pub fn from_parts(ip: &str, user_agent: &str) -> Option<Self> {
        if ip.is_empty() && user_agent.is_empty() {
            return None;
        }
        let digest = Sha256::digest(format!("{}|{}", ip, user_agent).as_bytes());
        Some(VisitorKey(hex::encode(digest)))
    }

    /// Client IP from `CF-Connecting-IP`, else the first `X-Forwarded-For`
    /// entry; user agent from `User-Agent`.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .unwrap_or("")
        };
        let ip = match header("cf-connecting-ip") {
            "" => header("x-forwarded-for")
                .split(',')
                .next()
                .unwrap_or("")
                .trim(),
            ip => ip,
        };
        Self::from_parts(ip, header("user-agent"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn store_key(&self) -> String {
        format!("{}{}", UNIQUE_PREFIX, self.0)
    }
}

/// Body of `GET /stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub downloads_total: u64,
    pub unique_users: u64,
}

/// Count one download and, for a visitor not seen within `retention`,
/// one unique user.
pub async fn record_download(
    store: &dyn AnalyticsStore,
    visitor: Option<&VisitorKey>,
    retention: Duration,
) -> Result<(), CoverError> {
    increment(store, DOWNLOADS_KEY).await?;

    let Some(visitor) = visitor else {
        return Ok(());
    };
    let key = visitor.store_key();
    if store.get(&key).await?.is_none() {
        store.put(&key, "1", Some(retention)).await?;
        increment(store, USERS_KEY).await?;
    }
    Ok(())
}

/// Read-modify-write increment. Returns the new value.
pub async fn increment(store: &dyn AnalyticsStore, key: &str) -> Result<u64, CoverError> {
    let next = read_counter(store, key).await? + 1;
    store.put(key, &next.to_string(), None).await?;
    Ok(next)
}

/// Counter value; missing or unparsable values read as 0.
pub async fn read_counter(store: &dyn AnalyticsStore, key: &str) -> Result<u64, CoverError> {
    Ok(store
        .get(key)
        .await?
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0))
}

pub async fn read_stats(store: &dyn AnalyticsStore) -> Result<Stats, CoverError> {
    Ok(Stats {
        downloads_total: read_counter(store, DOWNLOADS_KEY).await?,
        unique_users: read_counter(store, USERS_KEY).await?,
    })
}
