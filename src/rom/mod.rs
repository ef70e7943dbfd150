//! # ROM Header Game Codes
//!
//! Every supported cartridge image carries a 4-character ASCII game code at
//! a fixed offset of its header:
//!
//! | Platform | Tag   | Code offset | Minimum header |
//! |----------|-------|-------------|----------------|
//! | Nintendo DS | `nds` | 0x0C | 16 bytes |
//! | Game Boy Advance | `gba` | 0xAC | 0xB0 bytes |
//!
//! The last character of the code is the region letter (`E` for America,
//! `P` for Europe, `J` for Japan, ...).
//!
//! ## Example
//!
//! ```
//! use picocover::rom::{extract_code, Platform};
//!
//! let mut header = [0u8; 16];
//! header[0x0C..0x10].copy_from_slice(b"ASME");
//!
//! let code = extract_code(&header, Platform::Nds).unwrap();
//! assert_eq!(code.as_str(), "ASME");
//! assert_eq!(code.region(), Some('E'));
//! ```

use std::fmt;
use std::path::Path;

use crate::error::CoverError;

/// Length of a game code in bytes.
pub const CODE_LEN: usize = 4;

/// Supported ROM container families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Nintendo DS (`.nds`)
    Nds,
    /// Game Boy Advance (`.gba`)
    Gba,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Nds, Platform::Gba];

    /// Lower-case route tag (`nds` / `gba`).
    pub fn tag(self) -> &'static str {
        match self {
            Platform::Nds => "nds",
            Platform::Gba => "gba",
        }
    }

    /// Parse a route tag, ignoring ASCII case.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.tag().eq_ignore_ascii_case(tag))
    }

    /// Infer the platform from a ROM file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_tag)
    }

    /// Byte offset of the game code inside the header.
    pub fn code_offset(self) -> usize {
        match self {
            Platform::Nds => 0x0C,
            Platform::Gba => 0xAC,
        }
    }

    /// Number of header bytes needed to read the code.
    pub fn header_len(self) -> usize {
        self.code_offset() + CODE_LEN
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Game code read from a ROM header.
///
/// Always exactly four `char`s. Non-ASCII bytes decode to U+FFFD, so a
/// corrupt header still yields a code; use [`GameCode::is_well_formed`]
/// to check it looks like a real one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GameCode(String);

impl GameCode {
    /// Decode four header bytes.
    pub fn from_bytes(bytes: [u8; CODE_LEN]) -> Self {
        let code = bytes
            .iter()
            .map(|&b| {
                if b.is_ascii() {
                    b as char
                } else {
                    char::REPLACEMENT_CHARACTER
                }
            })
            .collect();
        GameCode(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Region letter (last character).
    pub fn region(&self) -> Option<char> {
        self.0.chars().last()
    }

    /// True when all four characters are ASCII alphanumerics.
    pub fn is_well_formed(&self) -> bool {
        self.0.chars().count() == CODE_LEN && self.0.chars().all(|c| c.is_ascii_alphanumeric())
    }
}

impl AsRef<str> for GameCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read the game code out of a ROM header.
///
/// `header` may be the whole ROM or just its first bytes; only
/// `platform.header_len()` bytes are required.
pub fn extract_code(header: &[u8], platform: Platform) -> Result<GameCode, CoverError> {
    let offset = platform.code_offset();
    let bytes: [u8; CODE_LEN] = header
        .get(offset..offset + CODE_LEN)
        .and_then(|s| s.try_into().ok())
        .ok_or(CoverError::HeaderTooShort {
            platform,
            needed: platform.header_len(),
            actual: header.len(),
        })?;
    Ok(GameCode::from_bytes(bytes))
}
