//! # 8-bit Indexed BMP Container
//!
//! The launcher reads covers as uncompressed Windows bitmaps with a
//! 256-entry color table.
//!
//! ## Layout
//!
//! ```text
//! Offset  Size  Field
//! ──────  ────  ─────────────────────────────────────
//! 0       2     "BM"
//! 2       4     file size
//! 6       4     reserved (0)
//! 10      4     pixel data offset (14 + 40 + 1024 = 1078)
//! 14      4     info header size (40)
//! 18      4     width
//! 22      4     height (positive = bottom-up rows)
//! 26      2     planes (1)
//! 28      2     bits per pixel (8)
//! 30      4     compression (0 = BI_RGB)
//! 34      4     pixel data size
//! 38      8     resolution (0, 0)
//! 46      4     colors used (256)
//! 50      4     important colors (0)
//! 54      1024  palette, 256 × (B, G, R, 0)
//! 1078    ...   rows, bottom row first, each padded to 4 bytes
//! ```
//!
//! Palette slots past the quantized palette are written as zero.

use super::quantize::MAX_COLORS;
use super::IndexedBitmap;

/// BITMAPFILEHEADER size.
pub const FILE_HEADER_LEN: usize = 14;

/// BITMAPINFOHEADER size.
pub const INFO_HEADER_LEN: usize = 40;

/// Color table size in bytes.
pub const PALETTE_LEN: usize = MAX_COLORS * 4;

/// Offset of the first pixel row.
pub const PIXEL_OFFSET: usize = FILE_HEADER_LEN + INFO_HEADER_LEN + PALETTE_LEN;

/// Bytes per stored row: one per pixel, rounded up to a multiple of 4.
#[inline]
pub fn row_stride(width: u32) -> usize {
    (width as usize).div_ceil(4) * 4
}

/// Total encoded size for the given dimensions.
pub fn encoded_len(width: u32, height: u32) -> usize {
    PIXEL_OFFSET + row_stride(width) * height as usize
}

/// Serialize an indexed bitmap.
pub fn encode(bitmap: &IndexedBitmap) -> Vec<u8> {
    let width = bitmap.width();
    let height = bitmap.height();
    let stride = row_stride(width);
    let image_size = stride * height as usize;
    let file_size = PIXEL_OFFSET + image_size;

    let mut out = Vec::with_capacity(file_size);

    // File header
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(file_size as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(PIXEL_OFFSET as u32).to_le_bytes());

    // Info header
    out.extend_from_slice(&(INFO_HEADER_LEN as u32).to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(height as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&8u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(image_size as u32).to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&(MAX_COLORS as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());

    // Color table
    let colors = bitmap.palette().colors();
    for slot in 0..MAX_COLORS {
        match colors.get(slot) {
            Some([r, g, b]) => out.extend_from_slice(&[*b, *g, *r, 0]),
            None => out.extend_from_slice(&[0, 0, 0, 0]),
        }
    }

    // Pixel rows, bottom-up
    let padding = stride - width as usize;
    for row in bitmap.pixels().chunks_exact(width as usize).rev() {
        out.extend_from_slice(row);
        out.extend(std::iter::repeat_n(0u8, padding));
    }

    out
}
