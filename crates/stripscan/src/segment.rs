//! Center-line pad segmentation.
//!
//! A single vertical scan at horizontal center classifies rows as
//! "colored" (below the brightness ceiling and above the saturation
//! floor, which excludes near-white strip backing and near-black shadow),
//! merges them into runs, and selects the seven longest runs as pads in
//! top-to-bottom order. Fewer than seven qualifying runs fails the pass:
//! the caller must not guess at partial data.

use std::collections::HashMap;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::calibration::WhiteBalance;
use crate::sample::{sample_region, PadColorSample, PixelRegion};
use crate::swatch::{PadKey, StripLayout, PAD_COUNT};
use crate::ScanError;

/// Configuration for center-line segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Rows with any channel at or above this are treated as strip backing.
    pub brightness_ceiling: u8,
    /// Rows with saturation `(max-min)/max` at or below this are excluded.
    pub saturation_floor: f64,
    /// A run qualifies only when `bottom - top` exceeds this many pixels.
    pub min_run_px: u32,
    /// Vertical shrink applied per side before sampling, against
    /// inter-pad boundary bleed.
    pub pad_margin_px: u32,
    /// Sampling band width as a fraction of image width.
    pub band_width_frac: f64,
    /// Lower bound on the sampling band width in pixels.
    pub min_band_width_px: u32,
}

impl SegmentConfig {
    pub const DEFAULT_BRIGHTNESS_CEILING: u8 = 245;
    pub const DEFAULT_SATURATION_FLOOR: f64 = 0.08;
    pub const DEFAULT_MIN_RUN_PX: u32 = 25;
    pub const DEFAULT_PAD_MARGIN_PX: u32 = 6;
    pub const DEFAULT_BAND_WIDTH_FRAC: f64 = 0.34;
    pub const DEFAULT_MIN_BAND_WIDTH_PX: u32 = 20;
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            brightness_ceiling: Self::DEFAULT_BRIGHTNESS_CEILING,
            saturation_floor: Self::DEFAULT_SATURATION_FLOOR,
            min_run_px: Self::DEFAULT_MIN_RUN_PX,
            pad_margin_px: Self::DEFAULT_PAD_MARGIN_PX,
            band_width_frac: Self::DEFAULT_BAND_WIDTH_FRAC,
            min_band_width_px: Self::DEFAULT_MIN_BAND_WIDTH_PX,
        }
    }
}

/// One contiguous colored run along the scan column, rows inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadRun {
    pub top: u32,
    pub bottom: u32,
}

impl PadRun {
    /// Row span used for ranking (`bottom - top`).
    pub fn span(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Row classification used by the center-line scan.
pub(crate) fn is_colored(rgb: [u8; 3], cfg: &SegmentConfig) -> bool {
    let max = rgb[0].max(rgb[1]).max(rgb[2]);
    let min = rgb[0].min(rgb[1]).min(rgb[2]);
    let sat = if max == 0 {
        0.0
    } else {
        (max - min) as f64 / max as f64
    };
    max < cfg.brightness_ceiling && sat > cfg.saturation_floor
}

/// Scan the vertical centerline and return qualifying colored runs,
/// top-to-bottom.
pub fn scan_runs(img: &RgbaImage, cfg: &SegmentConfig) -> Vec<PadRun> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Vec::new();
    }

    let x = w / 2;
    let mut runs = Vec::new();
    let mut open: Option<u32> = None;

    for y in 0..h {
        let p = img.get_pixel(x, y).0;
        let colored = is_colored([p[0], p[1], p[2]], cfg);
        match (colored, open) {
            (true, None) => open = Some(y),
            (false, Some(top)) => {
                push_qualifying(&mut runs, top, y - 1, cfg);
                open = None;
            }
            _ => {}
        }
    }
    if let Some(top) = open {
        push_qualifying(&mut runs, top, h - 1, cfg);
    }

    runs
}

fn push_qualifying(runs: &mut Vec<PadRun>, top: u32, bottom: u32, cfg: &SegmentConfig) {
    if bottom - top > cfg.min_run_px {
        runs.push(PadRun { top, bottom });
    }
}

/// Keep the seven longest runs, re-sorted top-to-bottom to match physical
/// pad order. `None` when fewer than seven runs qualify.
pub fn select_pads(runs: &[PadRun]) -> Option<Vec<PadRun>> {
    if runs.len() < PAD_COUNT {
        return None;
    }

    let mut ranked = runs.to_vec();
    // Stable sort: equal spans keep their top-to-bottom order.
    ranked.sort_by(|a, b| b.span().cmp(&a.span()));
    ranked.truncate(PAD_COUNT);
    ranked.sort_by_key(|r| r.top);
    Some(ranked)
}

/// Segment the strip and sample one robust color per pad.
///
/// Returns [`ScanError::InsufficientPads`] when fewer than seven runs
/// qualify, or when margin shrinking collapses a selected run.
pub fn sample_pads(
    img: &RgbaImage,
    layout: &StripLayout,
    cfg: &SegmentConfig,
    wb: &WhiteBalance,
) -> Result<HashMap<PadKey, PadColorSample>, ScanError> {
    let runs = scan_runs(img, cfg);
    tracing::debug!(runs = runs.len(), "center-line scan complete");

    let Some(selected) = select_pads(&runs) else {
        tracing::warn!(detected = runs.len(), required = PAD_COUNT, "retake required");
        return Err(ScanError::InsufficientPads {
            detected: runs.len(),
            required: PAD_COUNT,
        });
    };

    let (w, _) = img.dimensions();
    let x = w / 2;
    let band_w = ((w as f64 * cfg.band_width_frac).floor() as u32).max(cfg.min_band_width_px);
    let x1 = x.saturating_sub(band_w / 2);
    let x2 = (x1 + band_w).min(w);

    let mut samples = HashMap::with_capacity(PAD_COUNT);
    for (rank, run) in selected.iter().enumerate() {
        let y1 = run.top.saturating_add(cfg.pad_margin_px);
        let y2 = run.bottom.saturating_sub(cfg.pad_margin_px);
        if y2 <= y1 {
            tracing::debug!(rank, top = run.top, bottom = run.bottom, "run collapsed by margin");
            continue;
        }

        let Some(region) = PixelRegion::new(x1, y1, x2 - x1, y2 - y1) else {
            continue;
        };
        let Some(pad) = layout.pad_at(rank) else {
            continue;
        };

        samples.insert(pad.key, sample_region(img, region, wb));
    }

    if samples.len() < PAD_COUNT {
        tracing::warn!(
            detected = samples.len(),
            required = PAD_COUNT,
            "retake required"
        );
        return Err(ScanError::InsufficientPads {
            detected: samples.len(),
            required: PAD_COUNT,
        });
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::test_utils::{draw_pads_image, draw_strip_image, TYPICAL_PAD_COLORS};

    #[test]
    fn colored_filter_excludes_backing_and_shadow() {
        let cfg = SegmentConfig::default();
        // Near-white strip backing: too bright.
        assert!(!is_colored([255, 255, 255], &cfg));
        assert!(!is_colored([250, 240, 240], &cfg));
        // Near-black shadow: saturation is zero.
        assert!(!is_colored([0, 0, 0], &cfg));
        // Gray: bright enough but unsaturated.
        assert!(!is_colored([200, 200, 205], &cfg));
        // A reagent color passes.
        assert!(is_colored([154, 69, 5], &cfg));
    }

    #[test]
    fn run_shorter_than_minimum_is_noise() {
        let cfg = SegmentConfig::default();
        // span 25 (26 rows) is rejected, span 26 (27 rows) qualifies.
        let short = draw_pads_image(100, 200, &[([154, 69, 5], 26)]);
        assert!(scan_runs(&short, &cfg).is_empty());

        let long = draw_pads_image(100, 200, &[([154, 69, 5], 27)]);
        let runs = scan_runs(&long, &cfg);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].span(), 26);
    }

    #[test]
    fn run_touching_bottom_edge_is_closed() {
        let cfg = SegmentConfig::default();
        let mut img = crate::test_utils::solid_image(100, 100, [255, 255, 255]);
        for y in 60..100 {
            for x in 0..100 {
                img.put_pixel(x, y, image::Rgba([154, 69, 5, 255]));
            }
        }
        let runs = scan_runs(&img, &cfg);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].top, 60);
        assert_eq!(runs[0].bottom, 99);
    }

    #[test]
    fn seven_pad_strip_yields_seven_ordered_runs() {
        let img = draw_strip_image(240, 640, &TYPICAL_PAD_COLORS);
        let runs = scan_runs(&img, &SegmentConfig::default());
        assert_eq!(runs.len(), 7);
        for pair in runs.windows(2) {
            assert!(pair[0].bottom < pair[1].top);
        }
    }

    #[test]
    fn selection_keeps_seven_longest_in_vertical_order() {
        // Seven tall pads plus one short colored blob at the bottom.
        let mut pads: Vec<([u8; 3], u32)> =
            TYPICAL_PAD_COLORS.iter().map(|&c| (c, 60)).collect();
        pads.push(([200, 100, 100], 30));
        let img = draw_pads_image(240, 720, &pads);

        let runs = scan_runs(&img, &SegmentConfig::default());
        assert_eq!(runs.len(), 8);

        let selected = select_pads(&runs).expect("at least seven runs");
        assert_eq!(selected.len(), 7);
        for run in &selected {
            assert_eq!(run.span(), 59);
        }
        for pair in selected.windows(2) {
            assert!(pair[0].top < pair[1].top);
        }
    }

    #[test]
    fn fewer_than_seven_runs_fails_selection() {
        let pads: Vec<([u8; 3], u32)> = TYPICAL_PAD_COLORS[..6]
            .iter()
            .map(|&c| (c, 60))
            .collect();
        let img = draw_pads_image(240, 640, &pads);
        let runs = scan_runs(&img, &SegmentConfig::default());
        assert_eq!(runs.len(), 6);
        assert!(select_pads(&runs).is_none());
    }

    #[test]
    fn sample_pads_reports_detected_count_on_failure() {
        let pads: Vec<([u8; 3], u32)> = TYPICAL_PAD_COLORS[..5]
            .iter()
            .map(|&c| (c, 60))
            .collect();
        let img = draw_pads_image(240, 640, &pads);

        let err = sample_pads(
            &img,
            &StripLayout::default(),
            &SegmentConfig::default(),
            &WhiteBalance::identity(),
        )
        .expect_err("five pads must not produce a reading");

        assert_eq!(
            err,
            ScanError::InsufficientPads {
                detected: 5,
                required: PAD_COUNT
            }
        );
    }

    #[test]
    fn sample_pads_maps_ranks_to_layout_keys() {
        let img = draw_strip_image(240, 640, &TYPICAL_PAD_COLORS);
        let layout = StripLayout::default();
        let samples = sample_pads(
            &img,
            &layout,
            &SegmentConfig::default(),
            &WhiteBalance::identity(),
        )
        .expect("seven pads");

        assert_eq!(samples.len(), 7);
        for (rank, pad) in layout.pads().iter().enumerate() {
            let s = samples.get(&pad.key).expect("pad sampled");
            let expected = TYPICAL_PAD_COLORS[rank];
            assert_abs_diff_eq!(s.r, expected[0] as f64, epsilon = 1e-9);
            assert_abs_diff_eq!(s.g, expected[1] as f64, epsilon = 1e-9);
            assert_abs_diff_eq!(s.b, expected[2] as f64, epsilon = 1e-9);
            assert_abs_diff_eq!(s.variance, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn margin_collapse_counts_as_missing_pad() {
        // With an oversized margin every selected run collapses, so the
        // sampled-pad gate reports zero pads even though seven runs exist.
        let img = draw_strip_image(240, 640, &TYPICAL_PAD_COLORS);
        let cfg = SegmentConfig {
            pad_margin_px: 40,
            ..SegmentConfig::default()
        };

        let err = sample_pads(
            &img,
            &StripLayout::default(),
            &cfg,
            &WhiteBalance::identity(),
        )
        .expect_err("collapsed runs must not produce a reading");

        assert_eq!(
            err,
            ScanError::InsufficientPads {
                detected: 0,
                required: PAD_COUNT
            }
        );
    }
}
