//! Shared test utilities for image-based unit tests.
//!
//! Consolidated here so the segmentation, cache, and pipeline tests all
//! paint synthetic strips the same way.

use image::{Rgba, RgbaImage};

use crate::chemistry::ChemistryReading;

/// Pad paint colors for a typical strip, top-to-bottom.
///
/// Each color is saturated enough to pass the centerline filter and sits
/// unambiguously nearest one chart swatch:
/// hardness 120, free chlorine 3.0, bromine 6.0, total chlorine 5.0,
/// cyanuric acid 100, alkalinity 80, pH 7.6.
pub(crate) const TYPICAL_PAD_COLORS: [[u8; 3]; 7] = [
    [154, 69, 5],
    [236, 175, 227],
    [240, 180, 200],
    [92, 223, 88],
    [231, 158, 95],
    [159, 222, 114],
    [229, 150, 0],
];

/// Solid-color RGBA image.
pub(crate) fn solid_image(w: u32, h: u32, rgb: [u8; 3]) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

/// Paint full-width pads of the given heights on a white strip, starting
/// 40 px from the top with 20 px gaps.
pub(crate) fn draw_pads_image(w: u32, h: u32, pads: &[([u8; 3], u32)]) -> RgbaImage {
    let mut img = solid_image(w, h, [255, 255, 255]);
    let mut top = 40u32;
    for &(rgb, height) in pads {
        for y in top..(top + height).min(h) {
            for x in 0..w {
                img.put_pixel(x, y, Rgba([rgb[0], rgb[1], rgb[2], 255]));
            }
        }
        top += height + 20;
    }
    img
}

/// Paint a standard strip: 60 px pads, one per color.
pub(crate) fn draw_strip_image(w: u32, h: u32, colors: &[[u8; 3]; 7]) -> RgbaImage {
    let pads: Vec<([u8; 3], u32)> = colors.iter().map(|&c| (c, 60)).collect();
    draw_pads_image(w, h, &pads)
}

/// A plausible reading for cache tests.
pub(crate) fn reading_fixture() -> ChemistryReading {
    ChemistryReading {
        ph: 7.4,
        free_cl: 2.0,
        total_cl: 3.0,
        bromine: 6.8,
        hardness: 250,
        alk: 100,
        cya: 40,
        chlorine_corrected: false,
        ph_range: None,
        alk_range: None,
        cya_range: None,
        ph_confidence: Some(0.9),
        alk_confidence: Some(0.8),
        cya_confidence: Some(0.7),
    }
}
