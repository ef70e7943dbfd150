//! # Cover Transcoding
//!
//! Converts an arbitrary source image (any size, any format the `image`
//! crate decodes) into a fixed-size 8-bit palette BMP for the launcher.
//!
//! ## Pipeline
//!
//! ```text
//! bytes ─► decode ─► flatten onto black ─► resize (Triangle) ─► histogram
//!                                                                  │
//!                      BMP ◄─ encode ◄─ index mapping ◄─ median cut ◄┘
//! ```
//!
//! Resizing uses `image::imageops::resize` with the Triangle (bilinear)
//! filter. Its two passes go through an `f32` intermediate whose size
//! depends on which axis is resampled first; the job picks the order with
//! the smaller intermediate and refuses inputs where even that exceeds
//! [`MAX_INTERMEDIATE_PIXELS`].
//!
//! Work is split into steps by [`TranscodeJob`]: one resize step, then
//! row chunks for the histogram and the mapping. [`transcode`] drives
//! the job to completion in one go; [`transcode_yielding`] hands control
//! back to the tokio scheduler between chunks so a batch of covers does
//! not monopolise a single-threaded runtime. Both run the exact same
//! steps and produce byte-identical output.
//!
//! ## Example
//!
//! ```
//! use image::{DynamicImage, ImageFormat, RgbImage};
//! use picocover::transcode;
//!
//! let img = DynamicImage::ImageRgb8(RgbImage::from_fn(300, 200, |x, y| {
//!     image::Rgb([x as u8, y as u8, 128])
//! }));
//! let mut png = std::io::Cursor::new(Vec::new());
//! img.write_to(&mut png, ImageFormat::Png).unwrap();
//!
//! let bmp = transcode::transcode(png.get_ref(), 128, 96).unwrap();
//! assert_eq!(&bmp[0..2], b"BM");
//! assert_eq!(bmp.len(), transcode::bmp::encoded_len(128, 96));
//! ```

pub mod bmp;
pub mod quantize;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, RgbaImage};

use crate::error::CoverError;
use quantize::{Histogram, MAX_COLORS, Mapper, Palette};

/// Launcher cover width.
pub const DEFAULT_WIDTH: u32 = 128;

/// Launcher cover height.
pub const DEFAULT_HEIGHT: u32 = 96;

/// Largest accepted target dimension per axis.
pub const MAX_DIMENSION: u32 = 4096;

/// Rows processed per step.
pub const CHUNK_ROWS: usize = 16;

/// Largest resize intermediate accepted, in pixels (16 bytes each).
pub const MAX_INTERMEDIATE_PIXELS: u64 = 1 << 25;

/// Output of the transcoder: dimensions, palette and one index per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedBitmap {
    width: u32,
    height: u32,
    palette: Palette,
    pixels: Vec<u8>,
}

impl IndexedBitmap {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Palette indices, top row first, `width * height` bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Encode as an 8-bit BMP file.
    pub fn to_bmp(&self) -> Vec<u8> {
        bmp::encode(self)
    }
}

/// Transcode encoded image bytes into BMP bytes.
pub fn transcode(image_bytes: &[u8], width: u32, height: u32) -> Result<Vec<u8>, CoverError> {
    Ok(transcode_bitmap(image_bytes, width, height)?.to_bmp())
}

/// Transcode into an [`IndexedBitmap`] without encoding.
pub fn transcode_bitmap(
    image_bytes: &[u8],
    width: u32,
    height: u32,
) -> Result<IndexedBitmap, CoverError> {
    Ok(TranscodeJob::new(image_bytes, width, height)?.finish())
}

/// [`transcode`], yielding to the scheduler between row chunks.
pub async fn transcode_yielding(
    image_bytes: &[u8],
    width: u32,
    height: u32,
) -> Result<Vec<u8>, CoverError> {
    Ok(transcode_bitmap_yielding(image_bytes, width, height)
        .await?
        .to_bmp())
}

/// [`transcode_bitmap`], yielding to the scheduler between row chunks.
pub async fn transcode_bitmap_yielding(
    image_bytes: &[u8],
    width: u32,
    height: u32,
) -> Result<IndexedBitmap, CoverError> {
    let mut job = TranscodeJob::new(image_bytes, width, height)?;
    tokio::task::yield_now().await;
    while job.step() {
        tokio::task::yield_now().await;
    }
    Ok(job.finish())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Resize,
    Histogram { row: usize },
    Palette,
    Mapping { row: usize },
    Done,
}

/// Which axis `imageops::resize` resamples first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassOrder {
    /// Plain `resize`: intermediate is `source_width x height`.
    VerticalFirst,
    /// Resize the transposed image: intermediate is `width x source_height`.
    HorizontalFirst,
}

/// Pick the pass order with the smaller intermediate, or refuse the job.
fn pass_order(src_w: u32, src_h: u32, width: u32, height: u32) -> Result<PassOrder, CoverError> {
    let vertical_first = src_w as u64 * height as u64;
    let horizontal_first = width as u64 * src_h as u64;
    let (order, pixels) = if vertical_first <= horizontal_first {
        (PassOrder::VerticalFirst, vertical_first)
    } else {
        (PassOrder::HorizontalFirst, horizontal_first)
    };
    if pixels > MAX_INTERMEDIATE_PIXELS {
        return Err(CoverError::InvalidImage(format!(
            "resizing {}x{} to {}x{} needs {} intermediate pixels (limit {})",
            src_w, src_h, width, height, pixels, MAX_INTERMEDIATE_PIXELS
        )));
    }
    Ok(order)
}

/// Composite onto black and drop alpha.
fn flatten(source: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(source.width(), source.height(), |x, y| {
        let [r, g, b, a] = source.get_pixel(x, y).0;
        let over_black = |c: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
        Rgb([over_black(r), over_black(g), over_black(b)])
    })
}

/// Resumable transcoding state.
///
/// Decoding happens in [`TranscodeJob::new`]; every call to
/// [`TranscodeJob::step`] then does one bounded slice of work.
pub struct TranscodeJob {
    source: RgbaImage,
    width: usize,
    height: usize,
    order: PassOrder,
    /// Resized RGB pixels, `width * height * 3`.
    resized: Vec<u8>,
    histogram: Histogram,
    palette: Palette,
    indices: Vec<u8>,
    stage: Stage,
}

impl TranscodeJob {
    /// Validate the target size and decode the source image.
    pub fn new(image_bytes: &[u8], width: u32, height: u32) -> Result<Self, CoverError> {
        if width == 0 || height == 0 {
            return Err(CoverError::InvalidImage(format!(
                "target size {}x{} has zero area",
                width, height
            )));
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(CoverError::InvalidImage(format!(
                "target size {}x{} exceeds {}x{}",
                width, height, MAX_DIMENSION, MAX_DIMENSION
            )));
        }

        let decoded = image::load_from_memory(image_bytes)
            .map_err(|e| CoverError::InvalidImage(format!("Failed to decode image: {}", e)))?;
        Self::from_rgba(decoded.to_rgba8(), width, height)
    }

    /// Start from already decoded pixels.
    pub fn from_rgba(source: RgbaImage, width: u32, height: u32) -> Result<Self, CoverError> {
        if width == 0 || height == 0 {
            return Err(CoverError::InvalidImage(format!(
                "target size {}x{} has zero area",
                width, height
            )));
        }
        if source.width() == 0 || source.height() == 0 {
            return Err(CoverError::InvalidImage(format!(
                "source image {}x{} has zero area",
                source.width(),
                source.height()
            )));
        }
        let order = pass_order(source.width(), source.height(), width, height)?;

        let (w, h) = (width as usize, height as usize);
        Ok(Self {
            source,
            width: w,
            height: h,
            order,
            resized: Vec::new(),
            histogram: Histogram::new(),
            palette: Palette::default(),
            indices: Vec::with_capacity(w * h),
            stage: Stage::Resize,
        })
    }

    /// Do one chunk of work. Returns `false` once the job is complete.
    pub fn step(&mut self) -> bool {
        self.stage = match self.stage {
            Stage::Resize => {
                self.resize();
                Stage::Histogram { row: 0 }
            }
            Stage::Histogram { row } => {
                let end = (row + CHUNK_ROWS).min(self.height);
                let stride = self.width * 3;
                quantize::accumulate(&mut self.histogram, &self.resized[row * stride..end * stride]);
                if end == self.height {
                    Stage::Palette
                } else {
                    Stage::Histogram { row: end }
                }
            }
            Stage::Palette => {
                self.palette = quantize::median_cut(&self.histogram, MAX_COLORS);
                self.histogram = Histogram::new();
                Stage::Mapping { row: 0 }
            }
            Stage::Mapping { row } => {
                // Rows map independently, so the memo only lives per chunk
                let end = (row + CHUNK_ROWS).min(self.height);
                let stride = self.width * 3;
                let mut mapper = Mapper::new(&self.palette);
                mapper.map_row(&self.resized[row * stride..end * stride], &mut self.indices);
                if end == self.height {
                    Stage::Done
                } else {
                    Stage::Mapping { row: end }
                }
            }
            Stage::Done => Stage::Done,
        };
        self.stage != Stage::Done
    }

    /// Run any remaining steps and take the bitmap.
    pub fn finish(mut self) -> IndexedBitmap {
        while self.step() {}
        IndexedBitmap {
            width: self.width as u32,
            height: self.height as u32,
            palette: self.palette,
            pixels: self.indices,
        }
    }

    /// Flatten and resample the source. The source is released afterwards.
    fn resize(&mut self) {
        let flat = flatten(&std::mem::take(&mut self.source));
        let (w, h) = (self.width as u32, self.height as u32);
        let resized = match self.order {
            PassOrder::VerticalFirst => imageops::resize(&flat, w, h, FilterType::Triangle),
            PassOrder::HorizontalFirst => {
                let turned = imageops::rotate90(&flat);
                imageops::rotate270(&imageops::resize(&turned, h, w, FilterType::Triangle))
            }
        };
        self.resized = resized.into_raw();
    }
}
