//! Reading assembly: classification picks, chlorine ordering correction,
//! calibration offsets, final formatting.
//!
//! Assembly runs strictly sequentially over one pass: classify each pad,
//! correct the free/total chlorine pair (swap first, clamp second), derive
//! bromine when its pad has no chart, apply additive offsets, round.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::calibration::CalOffsets;
use crate::classify::nearest_two;
use crate::sample::PadColorSample;
use crate::stabilize::{round2, stabilize, PadPick, StabilityTable, FALLBACK_VARIANCE};
use crate::swatch::{PadKey, StripLayout};

/// Bromine estimate from total chlorine when the bromine pad has no chart.
const BROMINE_FROM_TOTAL_CL: f64 = 2.25;

/// Final calibrated reading for one analysis pass.
///
/// Immutable once produced; the invariant `total_cl >= free_cl` holds for
/// every reading this module emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChemistryReading {
    /// pH, two decimals.
    pub ph: f64,
    /// Free chlorine in ppm, two decimals.
    pub free_cl: f64,
    /// Total chlorine in ppm, two decimals. Never below `free_cl`.
    pub total_cl: f64,
    /// Bromine in ppm, one decimal.
    pub bromine: f64,
    /// Total hardness in ppm.
    pub hardness: i32,
    /// Total alkalinity in ppm.
    pub alk: i32,
    /// Cyanuric acid in ppm.
    pub cya: i32,
    /// Set when the free/total chlorine pair was swapped or clamped.
    pub chlorine_corrected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph_range: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alk_range: Option<[i32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cya_range: Option<[i32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alk_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cya_confidence: Option<f64>,
}

/// Classify one pad, falling back to `default` when the sample is missing
/// or the pad has no swatch chart.
fn pick_for(
    key: PadKey,
    default: f64,
    samples: &HashMap<PadKey, PadColorSample>,
    layout: &StripLayout,
) -> PadPick {
    let sample = samples.get(&key);
    let swatches = layout
        .pad(key)
        .map(|p| p.swatches.as_slice())
        .unwrap_or(&[]);

    if let Some(sample) = sample {
        if let Some(pick) = nearest_two(sample.rgb(), swatches) {
            return PadPick {
                value: pick.best_value,
                best_dist: pick.best_dist,
                second_value: pick.second_value,
                second_dist: pick.second_dist,
                variance: sample.variance,
            };
        }
    }

    PadPick {
        value: default,
        best_dist: f64::INFINITY,
        second_value: None,
        second_dist: f64::INFINITY,
        variance: FALLBACK_VARIANCE,
    }
}

/// Like [`pick_for`] but with no default: `None` when classification is
/// impossible (used by bromine, which derives from total chlorine instead).
fn pick_value(
    key: PadKey,
    samples: &HashMap<PadKey, PadColorSample>,
    layout: &StripLayout,
) -> Option<f64> {
    let sample = samples.get(&key)?;
    let swatches = layout.pad(key)?.swatches.as_slice();
    nearest_two(sample.rgb(), swatches).map(|p| p.best_value)
}

/// Assemble the seven pad samples into a calibrated reading.
///
/// `previous` is the hysteresis anchor for the stabilized parameters.
pub fn assemble_reading(
    layout: &StripLayout,
    stability: &StabilityTable,
    samples: &HashMap<PadKey, PadColorSample>,
    offsets: &CalOffsets,
    previous: Option<&ChemistryReading>,
) -> ChemistryReading {
    let ph_pick = pick_for(PadKey::Ph, 7.4, samples, layout);
    let ph_stab = stabilize(
        PadKey::Ph,
        &ph_pick,
        previous.map(|p| p.ph),
        stability.params(PadKey::Ph),
    );

    let mut free_cl = pick_for(PadKey::FreeCl, 2.0, samples, layout).value;
    let mut total_cl = pick_for(PadKey::TotalCl, free_cl + 0.5, samples, layout).value;

    let mut chlorine_corrected = false;

    // TC < FC is most often an adjacent-pad misassignment: try one swap.
    if total_cl < free_cl {
        std::mem::swap(&mut total_cl, &mut free_cl);
        chlorine_corrected = true;
    }

    // Enforce TC >= FC unconditionally.
    if total_cl < free_cl {
        total_cl = free_cl;
        chlorine_corrected = true;
    }

    if chlorine_corrected {
        tracing::debug!(free_cl, total_cl, "chlorine ordering corrected");
    }

    let bromine = pick_value(PadKey::Bromine, samples, layout)
        .unwrap_or(total_cl * BROMINE_FROM_TOTAL_CL);

    let hardness = pick_for(PadKey::Hardness, 250.0, samples, layout).value;

    let alk_stab = stabilize(
        PadKey::Alk,
        &pick_for(PadKey::Alk, 100.0, samples, layout),
        previous.map(|p| p.alk as f64),
        stability.params(PadKey::Alk),
    );

    let cya_stab = stabilize(
        PadKey::Cya,
        &pick_for(PadKey::Cya, 40.0, samples, layout),
        previous.map(|p| p.cya as f64),
        stability.params(PadKey::Cya),
    );

    ChemistryReading {
        ph: round2(ph_stab.value + offsets.ph),
        free_cl: round2(free_cl),
        total_cl: round2(total_cl),
        bromine: round1(bromine),
        hardness: (hardness + offsets.hardness).round() as i32,
        alk: (alk_stab.value + offsets.alk).round() as i32,
        cya: (cya_stab.value + offsets.cya).round() as i32,
        chlorine_corrected,
        ph_range: ph_stab.range,
        alk_range: alk_stab.range.map(round_range),
        cya_range: cya_stab.range.map(round_range),
        ph_confidence: Some(ph_stab.confidence),
        alk_confidence: Some(alk_stab.confidence),
        cya_confidence: Some(cya_stab.confidence),
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn round_range([lo, hi]: [f64; 2]) -> [i32; 2] {
    [lo.round() as i32, hi.round() as i32]
}
