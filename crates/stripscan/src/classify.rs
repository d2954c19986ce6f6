//! Nearest-two swatch classification.
//!
//! Squared Euclidean RGB distance only: relative ordering is all that is
//! needed, so the square root is never taken. Iteration follows swatch
//! list order with strict less-than comparisons, so the first occurrence
//! wins exact distance ties.

use serde::{Deserialize, Serialize};

use crate::swatch::Swatch;

/// Nearest and second-nearest reference points for one sampled color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierPick {
    /// Chart value of the nearest swatch.
    pub best_value: f64,
    /// Squared RGB distance to the nearest swatch.
    pub best_dist: f64,
    /// Chart value of the runner-up, if the list has more than one entry.
    pub second_value: Option<f64>,
    /// Squared RGB distance to the runner-up (infinite when absent).
    pub second_dist: f64,
}

/// Squared Euclidean distance between a sampled color and a chart color.
#[inline]
pub fn rgb_distance_sq(rgb: [f64; 3], chart: [u8; 3]) -> f64 {
    let dr = rgb[0] - chart[0] as f64;
    let dg = rgb[1] - chart[1] as f64;
    let db = rgb[2] - chart[2] as f64;
    dr * dr + dg * dg + db * db
}

/// Find the nearest and second-nearest swatches for a sampled color.
///
/// Returns `None` for an empty swatch list; the caller falls back to its
/// per-parameter default in that case.
pub fn nearest_two(rgb: [f64; 3], swatches: &[Swatch]) -> Option<ClassifierPick> {
    let first = swatches.first()?;

    let mut best = first;
    let mut best_dist = rgb_distance_sq(rgb, first.rgb);
    let mut second: Option<&Swatch> = None;
    let mut second_dist = f64::INFINITY;

    for swatch in &swatches[1..] {
        let d = rgb_distance_sq(rgb, swatch.rgb);
        if d < best_dist {
            second = Some(best);
            second_dist = best_dist;
            best = swatch;
            best_dist = d;
        } else if d < second_dist {
            second = Some(swatch);
            second_dist = d;
        }
    }

    Some(ClassifierPick {
        best_value: best.value,
        best_dist,
        second_value: second.map(|s| s.value),
        second_dist,
    })
}
