//! Transparency keying and black/white collapse.
//!
//! Predominantly transparent images get their alpha-zero pixels
//! replaced by an RGB triple that occurs nowhere else in the image.
//! Downstream clustering skips key-colored pixels entirely, leaving
//! the transparent region unassigned instead of tracing it.

use crate::color::Color;

/// Fraction of a sampled row that must be fully transparent before the
/// image is treated as transparent-dominant.
const TRANSPARENT_ROW_FRACTION: f64 = 0.4;

/// Deterministic seed for the fallback key-color generator, so repeated
/// runs on the same image pick the same key.
const KEY_RNG_SEED: u32 = 42;

/// Read the RGBA color of pixel `i` from a raw buffer.
pub(crate) fn pixel_at(pixels: &[u8], i: usize) -> Color {
    Color::new(
        pixels[i * 4],
        pixels[i * 4 + 1],
        pixels[i * 4 + 2],
        pixels[i * 4 + 3],
    )
}

/// Decide whether the image is transparent-dominant by sampling five
/// rows (top, quarter, middle, three-quarter, bottom) and counting
/// alpha-zero pixels against `0.4 * width`.
pub fn should_key(pixels: &[u8], width: usize, height: usize) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    let mut rows = [0, height / 4, height / 2, height * 3 / 4, height - 1];
    rows.sort_unstable();
    let threshold = (TRANSPARENT_ROW_FRACTION * width as f64) as usize;

    let mut transparent = 0usize;
    let mut prev = usize::MAX;
    for &y in &rows {
        if y == prev {
            continue;
        }
        prev = y;
        for x in 0..width {
            if pixels[(y * width + x) * 4 + 3] == 0 {
                transparent += 1;
                if transparent >= threshold {
                    return true;
                }
            }
        }
    }
    // A zero threshold keys unconditionally (degenerate tiny widths).
    transparent >= threshold
}

/// Minimal 32-bit linear congruential generator (Numerical Recipes
/// constants). Only used to propose candidate key colors.
struct Lcg {
    state: u32,
}

impl Lcg {
    fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.state
    }

    fn next_color(&mut self) -> Color {
        let v = self.next();
        Color::new((v >> 16) as u8, (v >> 8) as u8, v as u8, 255)
    }
}

/// Find an RGB triple not present in any pixel (alpha ignored): six
/// saturated primaries first, then six seeded pseudo-random colors,
/// then a fixed fallback.
pub fn find_unused_color(pixels: &[u8]) -> Color {
    let primaries = [
        Color::new(255, 0, 0, 255),
        Color::new(0, 255, 0, 255),
        Color::new(0, 0, 255, 255),
        Color::new(255, 255, 0, 255),
        Color::new(0, 255, 255, 255),
        Color::new(255, 0, 255, 255),
    ];

    let mut rng = Lcg::new(KEY_RNG_SEED);
    let candidates = primaries
        .into_iter()
        .chain(std::iter::from_fn(move || Some(rng.next_color())).take(6));

    for candidate in candidates {
        let used = (0..pixels.len() / 4).any(|i| pixel_at(pixels, i).same_rgb(&candidate));
        if !used {
            return candidate;
        }
    }
    Color::new(1, 2, 3, 255)
}

/// Overwrite every fully-transparent pixel with the opaque key color.
pub fn apply_key_color(pixels: &mut [u8], key: &Color) {
    for i in 0..pixels.len() / 4 {
        if pixels[i * 4 + 3] == 0 {
            pixels[i * 4] = key.r;
            pixels[i * 4 + 1] = key.g;
            pixels[i * 4 + 2] = key.b;
            pixels[i * 4 + 3] = 255;
        }
    }
}

/// Collapse every pixel to black or white by integer luminance.
/// Key-colored pixels are left untouched so the keyed region stays
/// identifiable for clustering.
pub fn binarize(pixels: &mut [u8], key: Option<&Color>) {
    for i in 0..pixels.len() / 4 {
        let color = pixel_at(pixels, i);
        if let Some(key) = key {
            if color.same_rgb(key) {
                continue;
            }
        }
        let value = if color.luminance() < 128 { 0 } else { 255 };
        pixels[i * 4] = value;
        pixels[i * 4 + 1] = value;
        pixels[i * 4 + 2] = value;
    }
}
