//! Request validation and cache keys.

use crate::error::CoverError;
use crate::rom::{CODE_LEN, Platform};

/// A validated cover lookup: known platform, 4 upper-case alphanumerics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoverRequest {
    platform: Platform,
    code: String,
}

impl CoverRequest {
    /// Validate raw route segments.
    ///
    /// The platform tag is case-insensitive and the code is upper-cased,
    /// so `nds/asme` and `NDS/ASME` are the same request.
    pub fn parse(platform: Option<&str>, code: Option<&str>) -> Result<Self, CoverError> {
        let platform = platform
            .and_then(Platform::from_tag)
            .ok_or_else(|| {
                CoverError::BadRequest(
                    "Invalid platform. Must be /nds/{gameid} or /gba/{gameid}".to_string(),
                )
            })?;
        let code = code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| CoverError::BadRequest("gameId is required".to_string()))?;
        Self::new(platform, code)
    }

    pub fn new(platform: Platform, code: &str) -> Result<Self, CoverError> {
        let code = code.to_uppercase();
        if code.chars().count() != CODE_LEN {
            return Err(CoverError::BadRequest(
                "Invalid gameId. Must be exactly 4 characters.".to_string(),
            ));
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoverError::BadRequest(
                "Invalid gameId. Must be alphanumeric.".to_string(),
            ));
        }
        Ok(Self { platform, code })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// `"<platform>:<CODE>"`, e.g. `nds:ASME`.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.platform.tag(), self.code)
    }
}
