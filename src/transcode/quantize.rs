//! # Median-Cut Color Quantization
//!
//! Reduces an RGB image to at most 256 colors.
//!
//! ## Algorithm
//!
//! 1. Count every distinct color (an ordered map, so iteration order
//!    depends only on the colors themselves).
//! 2. Start with one box holding all colors. Repeatedly take the box with
//!    the widest channel range, sort its colors along that channel and cut
//!    it at the pixel-weighted median.
//! 3. Stop at `max_colors` boxes or when every box holds a single color.
//! 4. Each box contributes the pixel-weighted mean of its colors. The
//!    entries are sorted and de-duplicated to form the palette.
//!
//! An image with 256 or fewer distinct colors therefore gets an exact
//! palette. Pixels map to the palette entry with the smallest squared
//! Euclidean RGB distance; ties go to the lowest index.

use std::collections::{BTreeMap, HashMap};

/// An RGB triple.
pub type Rgb = [u8; 3];

/// Pixel counts per distinct color.
pub type Histogram = BTreeMap<Rgb, u32>;

/// Largest palette an 8-bit indexed bitmap can address.
pub const MAX_COLORS: usize = 256;

/// Ordered, duplicate-free list of at most 256 colors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Index of the closest entry. The palette must not be empty.
    pub fn nearest(&self, color: Rgb) -> u8 {
        let mut best = 0usize;
        let mut best_dist = u32::MAX;
        for (i, entry) in self.colors.iter().enumerate() {
            let dist = distance_sq(color, *entry);
            if dist < best_dist {
                best = i;
                best_dist = dist;
                if dist == 0 {
                    break;
                }
            }
        }
        best as u8
    }
}

#[inline]
fn distance_sq(a: Rgb, b: Rgb) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as i32 - y as i32;
            (d * d) as u32
        })
        .sum()
}

/// Add a row of packed RGB pixels to a histogram.
pub fn accumulate(histogram: &mut Histogram, rgb: &[u8]) {
    for px in rgb.chunks_exact(3) {
        *histogram.entry([px[0], px[1], px[2]]).or_insert(0) += 1;
    }
}

/// Build a palette of at most `max_colors` entries (clamped to 256).
pub fn median_cut(histogram: &Histogram, max_colors: usize) -> Palette {
    let max_colors = max_colors.clamp(1, MAX_COLORS);
    if histogram.is_empty() {
        return Palette::default();
    }

    let mut boxes = vec![ColorBox {
        colors: histogram.iter().map(|(c, n)| (*c, *n)).collect(),
    }];

    while boxes.len() < max_colors {
        let Some(target) = widest_splittable(&boxes) else {
            break;
        };
        let upper = boxes[target].split();
        boxes.push(upper);
    }

    let mut colors: Vec<Rgb> = boxes.iter().map(ColorBox::mean).collect();
    colors.sort_unstable();
    colors.dedup();
    Palette { colors }
}

/// Box with the widest channel range and more than one color.
/// Earlier boxes win ties.
fn widest_splittable(boxes: &[ColorBox]) -> Option<usize> {
    let mut best: Option<(usize, u8, u64)> = None;
    for (i, b) in boxes.iter().enumerate() {
        if b.colors.len() < 2 {
            continue;
        }
        let (_, range) = b.widest_channel();
        let population = b.population();
        let better = match best {
            None => true,
            Some((_, r, p)) => range > r || (range == r && population > p),
        };
        if better {
            best = Some((i, range, population));
        }
    }
    best.map(|(i, _, _)| i)
}

#[derive(Debug)]
struct ColorBox {
    colors: Vec<(Rgb, u32)>,
}

impl ColorBox {
    fn population(&self) -> u64 {
        self.colors.iter().map(|(_, n)| *n as u64).sum()
    }

    fn widest_channel(&self) -> (usize, u8) {
        let mut lo = [u8::MAX; 3];
        let mut hi = [u8::MIN; 3];
        for (c, _) in &self.colors {
            for ch in 0..3 {
                lo[ch] = lo[ch].min(c[ch]);
                hi[ch] = hi[ch].max(c[ch]);
            }
        }
        (0..3)
            .map(|ch| (ch, hi[ch] - lo[ch]))
            .fold((0, 0), |best, cur| if cur.1 > best.1 { cur } else { best })
    }

    /// Cut at the weighted median of the widest channel. Keeps the lower
    /// half and returns the upper half. Requires at least two colors.
    fn split(&mut self) -> ColorBox {
        let (ch, _) = self.widest_channel();
        self.colors.sort_unstable_by_key(|(c, _)| (c[ch], *c));

        let half = self.population().div_ceil(2);
        let mut seen = 0u64;
        let mut cut = self.colors.len() - 1;
        for (i, (_, n)) in self.colors.iter().enumerate() {
            seen += *n as u64;
            if seen >= half {
                cut = i + 1;
                break;
            }
        }
        let cut = cut.clamp(1, self.colors.len() - 1);

        ColorBox {
            colors: self.colors.split_off(cut),
        }
    }

    fn mean(&self) -> Rgb {
        let total = self.population();
        let mut sums = [0u64; 3];
        for (c, n) in &self.colors {
            for ch in 0..3 {
                sums[ch] += c[ch] as u64 * *n as u64;
            }
        }
        sums.map(|s| ((s + total / 2) / total) as u8)
    }
}

/// Memoizing color → index lookup.
pub struct Mapper<'a> {
    palette: &'a Palette,
    memo: HashMap<Rgb, u8>,
}

impl<'a> Mapper<'a> {
    pub fn new(palette: &'a Palette) -> Self {
        Self {
            palette,
            memo: HashMap::new(),
        }
    }

    pub fn index_of(&mut self, color: Rgb) -> u8 {
        let palette = self.palette;
        *self
            .memo
            .entry(color)
            .or_insert_with(|| palette.nearest(color))
    }

    /// Map a row of packed RGB pixels, appending indices to `out`.
    pub fn map_row(&mut self, rgb: &[u8], out: &mut Vec<u8>) {
        for px in rgb.chunks_exact(3) {
            out.push(self.index_of([px[0], px[1], px[2]]));
        }
    }
}
