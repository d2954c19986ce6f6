//! Temporal stabilization: ambiguity ranging, hysteresis, confidence.
//!
//! Only pH, alkalinity, and cyanuric acid get this treatment; the other
//! parameters pass the raw classifier value through. A pick is ambiguous
//! when the two nearest swatches are nearly equidistant or the pad color
//! itself was visually inconsistent; an ambiguous pick widens into a range
//! and reports its midpoint. Hysteresis snaps small jitter between
//! consecutive scans of a stable pool back to the previous reading.

use serde::{Deserialize, Serialize};

use crate::swatch::PadKey;

/// Sample variance above which a pick is ambiguous regardless of the
/// distance ratio.
pub const AMBIGUOUS_VARIANCE: f64 = 10.0;

/// Variance reported for picks that fell back to a parameter default.
pub const FALLBACK_VARIANCE: f64 = 999.0;

const CONFIDENCE_DIST_SCALE: f64 = 35.0;
const CONFIDENCE_VARIANCE_SCALE: f64 = 12.0;

/// Per-parameter stabilization thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityParams {
    /// Hysteresis threshold: a new value within `snap` of the previous
    /// reading is replaced by the previous reading.
    pub snap: f64,
    /// Best/second distance ratio above which the pick is ambiguous.
    pub ambiguous_ratio: f64,
    /// Whether an ambiguous pick widens into a range.
    pub enable_range: bool,
}

/// Stabilization table for the three borderline-prone parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityTable {
    pub alk: StabilityParams,
    pub cya: StabilityParams,
    pub ph: StabilityParams,
}

impl Default for StabilityTable {
    fn default() -> Self {
        Self {
            alk: StabilityParams {
                snap: 40.0,
                ambiguous_ratio: 0.72,
                enable_range: true,
            },
            cya: StabilityParams {
                snap: 20.0,
                ambiguous_ratio: 0.75,
                enable_range: true,
            },
            ph: StabilityParams {
                snap: 0.2,
                ambiguous_ratio: 0.78,
                enable_range: true,
            },
        }
    }
}

impl StabilityTable {
    /// Stabilization parameters for a pad, `None` for pass-through pads.
    pub fn params(&self, key: PadKey) -> Option<&StabilityParams> {
        match key {
            PadKey::Alk => Some(&self.alk),
            PadKey::Cya => Some(&self.cya),
            PadKey::Ph => Some(&self.ph),
            _ => None,
        }
    }
}

/// Classifier pick enriched with the resolved value and sample variance,
/// ready for stabilization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PadPick {
    /// Best swatch value, or the parameter default on fallback.
    pub value: f64,
    /// Squared distance to the best swatch (infinite on fallback).
    pub best_dist: f64,
    pub second_value: Option<f64>,
    pub second_dist: f64,
    /// Pad sample variance ([`FALLBACK_VARIANCE`] on fallback).
    pub variance: f64,
}

/// Final stabilized value for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilizedValue {
    pub value: f64,
    /// `[low, high]` when the pick was ambiguous and ranging is enabled.
    pub range: Option<[f64; 2]>,
    /// Combined classification sharpness and sample uniformity in [0, 1].
    pub confidence: f64,
}

/// Stabilize one pick against the previous reading of the same parameter.
///
/// `params` is `None` for parameters outside the stabilization table; those
/// pass the raw value through with full confidence and no range.
pub fn stabilize(
    key: PadKey,
    pick: &PadPick,
    previous: Option<f64>,
    params: Option<&StabilityParams>,
) -> StabilizedValue {
    let Some(cfg) = params else {
        return StabilizedValue {
            value: pick.value,
            range: None,
            confidence: 1.0,
        };
    };

    let ratio = if pick.second_dist.is_finite() && pick.second_dist > 0.0 {
        pick.best_dist / pick.second_dist
    } else {
        0.0
    };

    let ambiguous = (pick.second_value.is_some() && ratio > cfg.ambiguous_ratio)
        || pick.variance > AMBIGUOUS_VARIANCE;

    let mut value = pick.value;
    let mut range = None;

    if cfg.enable_range && ambiguous {
        if let Some(second) = pick.second_value {
            let lo = pick.value.min(second);
            let hi = pick.value.max(second);
            range = Some([lo, hi]);
            let mid = (lo + hi) / 2.0;
            value = if key == PadKey::Ph {
                round2(mid)
            } else {
                mid.round()
            };
        }
    }

    if let Some(prev) = previous {
        if prev.is_finite() && (value - prev).abs() <= cfg.snap {
            value = prev;
        }
    }

    let dist_score = 1.0 / (1.0 + pick.best_dist.sqrt() / CONFIDENCE_DIST_SCALE);
    let variance_score = 1.0 / (1.0 + pick.variance / CONFIDENCE_VARIANCE_SCALE);
    let confidence = (dist_score * variance_score).clamp(0.0, 1.0);

    StabilizedValue {
        value,
        range,
        confidence,
    }
}

/// Round to two decimal places (pH resolution).
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn sharp_pick(value: f64) -> PadPick {
        PadPick {
            value,
            best_dist: 0.0,
            second_value: Some(value + 1.0),
            second_dist: 1000.0,
            variance: 0.0,
        }
    }

    #[test]
    fn untabled_parameter_passes_through() {
        let pick = PadPick {
            value: 250.0,
            best_dist: 400.0,
            second_value: Some(120.0),
            second_dist: 410.0,
            variance: 50.0,
        };
        let out = stabilize(PadKey::Hardness, &pick, Some(120.0), None);
        assert_abs_diff_eq!(out.value, 250.0, epsilon = 1e-12);
        assert_eq!(out.range, None);
        assert_abs_diff_eq!(out.confidence, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn ambiguous_alkalinity_ranges_to_midpoint() {
        // ratio = 50/60 = 0.833 > 0.72 -> ambiguous, range [80, 120], mid 100.
        let table = StabilityTable::default();
        let pick = PadPick {
            value: 80.0,
            best_dist: 50.0,
            second_value: Some(120.0),
            second_dist: 60.0,
            variance: 0.0,
        };
        let out = stabilize(PadKey::Alk, &pick, None, table.params(PadKey::Alk));
        assert_eq!(out.range, Some([80.0, 120.0]));
        assert_abs_diff_eq!(out.value, 100.0, epsilon = 1e-12);
    }

    #[test]
    fn sharp_pick_keeps_best_value_without_range() {
        let table = StabilityTable::default();
        let out = stabilize(
            PadKey::Alk,
            &PadPick {
                value: 80.0,
                best_dist: 10.0,
                second_value: Some(120.0),
                second_dist: 500.0,
                variance: 0.0,
            },
            None,
            table.params(PadKey::Alk),
        );
        assert_eq!(out.range, None);
        assert_abs_diff_eq!(out.value, 80.0, epsilon = 1e-12);
    }

    #[test]
    fn high_variance_alone_triggers_ranging() {
        let table = StabilityTable::default();
        let pick = PadPick {
            value: 40.0,
            best_dist: 5.0,
            second_value: Some(100.0),
            second_dist: 5000.0,
            variance: 11.0,
        };
        let out = stabilize(PadKey::Cya, &pick, None, table.params(PadKey::Cya));
        assert_eq!(out.range, Some([40.0, 100.0]));
        assert_abs_diff_eq!(out.value, 70.0, epsilon = 1e-12);
    }

    #[test]
    fn ph_midpoint_rounds_to_two_decimals() {
        let table = StabilityTable::default();
        let pick = PadPick {
            value: 7.6,
            best_dist: 90.0,
            second_value: Some(7.2),
            second_dist: 100.0,
            variance: 0.0,
        };
        let out = stabilize(PadKey::Ph, &pick, None, table.params(PadKey::Ph));
        assert_eq!(out.range, Some([7.2, 7.6]));
        assert_abs_diff_eq!(out.value, 7.4, epsilon = 1e-12);
    }

    #[test]
    fn hysteresis_snaps_to_previous_exactly() {
        let table = StabilityTable::default();
        let out = stabilize(
            PadKey::Alk,
            &sharp_pick(120.0),
            Some(80.0),
            table.params(PadKey::Alk),
        );
        // |120 - 80| <= snap 40 -> previous value verbatim.
        assert_eq!(out.value, 80.0);

        let out = stabilize(
            PadKey::Alk,
            &sharp_pick(180.0),
            Some(80.0),
            table.params(PadKey::Alk),
        );
        assert_eq!(out.value, 180.0);
    }

    #[test]
    fn hysteresis_applies_after_ranging() {
        // Ambiguous pick midpoints to 100, then snaps to the previous 80.
        let table = StabilityTable::default();
        let pick = PadPick {
            value: 80.0,
            best_dist: 50.0,
            second_value: Some(120.0),
            second_dist: 60.0,
            variance: 0.0,
        };
        let out = stabilize(PadKey::Alk, &pick, Some(80.0), table.params(PadKey::Alk));
        assert_eq!(out.range, Some([80.0, 120.0]));
        assert_eq!(out.value, 80.0);
    }

    #[test]
    fn confidence_combines_distance_and_variance() {
        let table = StabilityTable::default();

        // Perfect pick: distance 0, variance 0 -> confidence 1.
        let out = stabilize(PadKey::Ph, &sharp_pick(7.4), None, table.params(PadKey::Ph));
        assert_abs_diff_eq!(out.confidence, 1.0, epsilon = 1e-12);

        // sqrt(best_dist) = 35 and variance = 12 -> 0.5 * 0.5 = 0.25.
        let pick = PadPick {
            value: 7.4,
            best_dist: 1225.0,
            second_value: None,
            second_dist: f64::INFINITY,
            variance: 12.0,
        };
        let out = stabilize(PadKey::Ph, &pick, None, table.params(PadKey::Ph));
        assert_abs_diff_eq!(out.confidence, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn fallback_pick_has_zero_confidence_and_no_range() {
        let table = StabilityTable::default();
        let pick = PadPick {
            value: 100.0,
            best_dist: f64::INFINITY,
            second_value: None,
            second_dist: f64::INFINITY,
            variance: FALLBACK_VARIANCE,
        };
        let out = stabilize(PadKey::Alk, &pick, None, table.params(PadKey::Alk));
        assert_eq!(out.range, None);
        assert_abs_diff_eq!(out.confidence, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.value, 100.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_second_distance_does_not_divide() {
        // Exact duplicate swatches: second distance 0 -> ratio treated as 0.
        let table = StabilityTable::default();
        let pick = PadPick {
            value: 80.0,
            best_dist: 0.0,
            second_value: Some(120.0),
            second_dist: 0.0,
            variance: 0.0,
        };
        let out = stabilize(PadKey::Alk, &pick, None, table.params(PadKey::Alk));
        assert_eq!(out.range, None);
        assert_abs_diff_eq!(out.value, 80.0, epsilon = 1e-12);
    }
}
