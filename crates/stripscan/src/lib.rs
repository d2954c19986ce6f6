//! stripscan — colorimetric classification of multi-pad water test strips.
//!
//! Turns a photographed multi-pad test-strip buffer into calibrated
//! water-chemistry readings. The pipeline stages are:
//!
//! 1. **Segment** – centerline scan isolates the seven reagent pads.
//! 2. **Sample** – robust per-pad color via grid median + MAD, white-balance
//!    corrected.
//! 3. **Classify** – nearest-two swatch match by squared RGB distance.
//! 4. **Stabilize** – ambiguity ranging, hysteresis against the previous
//!    reading, confidence scoring.
//! 5. **Assemble** – chlorine ordering correction, calibration offsets,
//!    final formatting.
//! 6. **Memoize** – content-hash result cache so identical buffers always
//!    reproduce identical readings.
//!
//! # Public API
//! [`Analyzer`] is the primary entry point: create one with a
//! [`StripLayout`] (the embedded default covers the EasyTest 7-in-1 chart),
//! then call [`Analyzer::analyze`] per captured buffer with the active
//! [`CalibrationProfile`]. Lower-level stages are exported for tooling and
//! tests.
//!
//! The core is a best-effort heuristic classifier, not a colorimetrically
//! rigorous instrument: white balance is a single user-set neutral sample
//! and calibration is four manual numeric offsets.

mod analyze;
mod cache;
mod calibration;
mod chemistry;
mod classify;
mod fingerprint;
mod sample;
mod segment;
mod stabilize;
mod swatch;

#[cfg(test)]
pub(crate) mod test_utils;

pub use analyze::{AnalyzeConfig, Analyzer, ScanReport};
pub use cache::{image_hash, CacheEntry, ResultCache, DEFAULT_CACHE_CAPACITY};
pub use calibration::{CalOffsets, CalibrationProfile, WhiteBalance};
pub use chemistry::{assemble_reading, ChemistryReading};
pub use classify::{nearest_two, rgb_distance_sq, ClassifierPick};
pub use fingerprint::{
    FingerprintLog, PadFingerprintEntry, ScanFingerprint, DEFAULT_FINGERPRINT_CAPACITY,
};
pub use sample::{sample_average, sample_region, PadColorSample, PixelRegion, GRID_SIZE};
pub use segment::{sample_pads, scan_runs, select_pads, PadRun, SegmentConfig};
pub use stabilize::{
    stabilize, PadPick, StabilityParams, StabilityTable, StabilizedValue, AMBIGUOUS_VARIANCE,
    FALLBACK_VARIANCE,
};
pub use swatch::{PadConfig, PadKey, StripLayout, Swatch, PAD_COUNT};

/// Errors surfaced by [`Analyzer::analyze`].
///
/// Everything else inside the core degrades instead of failing: missing
/// charts fall back to parameter defaults with zero confidence, chlorine
/// ordering violations are auto-corrected and flagged, and cache problems
/// reduce to a no-op.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// Fewer than the required number of reagent pads could be isolated
    /// and sampled. Recoverable: ask the user to retake the photo.
    #[error("insufficient pads: detected {detected} of {required}; retake the photo")]
    InsufficientPads { detected: usize, required: usize },
}
