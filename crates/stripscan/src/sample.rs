//! Robust pad color sampling.
//!
//! A pad's representative color comes from a fixed 9x9 cell-center grid
//! rather than full-pixel averaging: per-channel median across the 81
//! samples resists localized glare, and the median absolute deviation
//! feeds the `variance` trust signal. All channels are white-balance
//! corrected before aggregation.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::calibration::WhiteBalance;

/// Sample grid dimensions (cells per axis).
pub const GRID_SIZE: usize = 9;

const GRID_SAMPLES: usize = GRID_SIZE * GRID_SIZE;

/// Robust color statistics for one pad region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PadColorSample {
    /// Per-channel medians, white-balance corrected.
    pub r: f64,
    pub g: f64,
    pub b: f64,
    /// Mean of the three per-channel median absolute deviations.
    /// Higher means a less uniform pad, i.e. lower trust.
    pub variance: f64,
}

impl PadColorSample {
    /// Channel medians as an RGB triple.
    pub fn rgb(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }
}

/// Axis-aligned pixel region, non-empty by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl PixelRegion {
    /// Create a region; `None` when either dimension is zero.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            x,
            y,
            width,
            height,
        })
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Extract robust color statistics from a region.
///
/// Pure function of the pixel buffer and white balance: best-effort even on
/// noisy input, with degraded `variance` as the only failure signal. Grid
/// points outside the image are clamped to the last row/column.
pub fn sample_region(img: &RgbaImage, region: PixelRegion, wb: &WhiteBalance) -> PadColorSample {
    let (img_w, img_h) = img.dimensions();

    let mut rs = [0.0f64; GRID_SAMPLES];
    let mut gs = [0.0f64; GRID_SAMPLES];
    let mut bs = [0.0f64; GRID_SAMPLES];

    let cell_w = region.width as f64 / GRID_SIZE as f64;
    let cell_h = region.height as f64 / GRID_SIZE as f64;

    for gy in 0..GRID_SIZE {
        let dy = ((gy as f64 + 0.5) * cell_h).floor() as u32;
        let py = (region.y + dy).min(img_h.saturating_sub(1));
        for gx in 0..GRID_SIZE {
            let dx = ((gx as f64 + 0.5) * cell_w).floor() as u32;
            let px = (region.x + dx).min(img_w.saturating_sub(1));

            let p = img.get_pixel(px, py).0;
            let [r, g, b] = wb.correct([p[0], p[1], p[2]]);

            let i = gy * GRID_SIZE + gx;
            rs[i] = r;
            gs[i] = g;
            bs[i] = b;
        }
    }

    let mr = median(&mut rs);
    let mg = median(&mut gs);
    let mb = median(&mut bs);

    let vr = mad(&rs, mr);
    let vg = mad(&gs, mg);
    let vb = mad(&bs, mb);

    PadColorSample {
        r: mr,
        g: mg,
        b: mb,
        variance: (vr + vg + vb) / 3.0,
    }
}

/// Mean white-balance-corrected RGB over the central stripe band
/// (x 20%..80%, y 45%..55%).
///
/// Coarse whole-strip color used for the diagnostic fingerprint and scan
/// summary, not for classification.
pub fn sample_average(img: &RgbaImage, wb: &WhiteBalance) -> [f64; 3] {
    let (w, h) = img.dimensions();

    let x0 = ((w as f64 * 0.2).round() as u32).min(w.saturating_sub(1));
    let y0 = ((h as f64 * 0.45).round() as u32).min(h.saturating_sub(1));
    let rw = ((w as f64 * 0.6).round() as u32).clamp(1, w - x0);
    let rh = ((h as f64 * 0.1).round() as u32).clamp(1, h - y0);

    let mut sum = [0.0f64; 3];
    let mut count = 0u64;

    for y in y0..y0 + rh {
        for x in x0..x0 + rw {
            let p = img.get_pixel(x, y).0;
            let [r, g, b] = wb.correct([p[0], p[1], p[2]]);
            sum[0] += r;
            sum[1] += g;
            sum[2] += b;
            count += 1;
        }
    }

    let n = count as f64;
    [sum[0] / n, sum[1] / n, sum[2] / n]
}

/// Median of a sample buffer (upper median for even lengths).
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    values[values.len() / 2]
}

/// Median absolute deviation from a given center.
fn mad(values: &[f64], center: f64) -> f64 {
    let mut deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&mut deviations)
}
