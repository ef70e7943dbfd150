//! # Picocover - Cover Art for Flashcart Launchers
//!
//! Picocover finds box art for Nintendo DS and Game Boy Advance ROMs and
//! turns it into something a handheld launcher can draw. It provides:
//!
//! - **Code extraction**: the 4-character game code from a ROM header
//! - **Cover proxy**: cached, region-aware cover lookup over HTTP
//! - **Transcoding**: any image to a fixed-size 8-bit palette BMP
//!
//! ## Quick Start
//!
//! ```no_run
//! use picocover::{Platform, extract_code, transcode};
//!
//! let rom = std::fs::read("game.nds")?;
//! let code = extract_code(&rom, Platform::Nds)?;
//! println!("{} ({})", code, Platform::Nds);
//!
//! // Cover bytes fetched from `GET /nds/{code}`
//! let cover = std::fs::read("cover.jpg")?;
//! let bmp = transcode::transcode(
//!     &cover,
//!     transcode::DEFAULT_WIDTH,
//!     transcode::DEFAULT_HEIGHT,
//! )?;
//! std::fs::write("cover.bmp", bmp)?;
//!
//! # Ok::<(), picocover::CoverError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`rom`] | Platforms and game code extraction |
//! | [`proxy`] | Cover resolution across cache, art host and object store |
//! | [`store`] | Store interfaces and local implementations |
//! | [`server`] | axum HTTP front end for the proxy |
//! | [`transcode`] | Resize, quantize and BMP encoding |
//! | [`error`] | Error types |

pub mod error;
pub mod proxy;
pub mod rom;
pub mod server;
pub mod store;
pub mod transcode;

// Re-exports for convenience
pub use error::CoverError;
pub use proxy::{CacheState, Cover, CoverProxy, ProxyConfig};
pub use rom::{GameCode, Platform, extract_code};
pub use transcode::{IndexedBitmap, TranscodeJob};
