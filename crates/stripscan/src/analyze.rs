//! End-to-end analysis pipeline.
//!
//! One pass runs to completion synchronously: hash lookup -> segmentation
//! -> pad sampling -> classification -> stabilization -> chemistry
//! assembly -> cache store. The analyzer owns the per-session mutable
//! state (result cache, last reading, fingerprint log) so nothing lives in
//! module-level globals and tests inject fixtures freely. The calibration
//! profile is read per pass and treated as a snapshot.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::cache::{image_hash, ResultCache, DEFAULT_CACHE_CAPACITY};
use crate::calibration::CalibrationProfile;
use crate::chemistry::{assemble_reading, ChemistryReading};
use crate::fingerprint::{FingerprintLog, ScanFingerprint, DEFAULT_FINGERPRINT_CAPACITY};
use crate::sample::sample_average;
use crate::segment::{sample_pads, SegmentConfig};
use crate::stabilize::StabilityTable;
use crate::swatch::StripLayout;
use crate::ScanError;

/// Tunables for one analyzer instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeConfig {
    pub segment: SegmentConfig,
    pub stability: StabilityTable,
    pub cache_capacity: usize,
    pub fingerprint_capacity: usize,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            segment: SegmentConfig::default(),
            stability: StabilityTable::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            fingerprint_capacity: DEFAULT_FINGERPRINT_CAPACITY,
        }
    }
}

/// Result of one successful analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub reading: ChemistryReading,
    /// Content hash of the analyzed buffer.
    pub hash: String,
    /// Whether the reading was replayed from the cache.
    pub cached: bool,
    /// Average-stripe RGB; absent on cache replay (no sampling ran).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rgb: Option<[f64; 3]>,
}

/// Primary analysis interface.
///
/// Create once with a strip layout, analyze many buffers. Buffers must
/// already be cropped/oriented/scaled by the caller; the core performs no
/// orientation correction.
pub struct Analyzer {
    layout: StripLayout,
    config: AnalyzeConfig,
    cache: ResultCache,
    fingerprints: FingerprintLog,
    last_reading: Option<ChemistryReading>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(StripLayout::default())
    }
}

impl Analyzer {
    /// Create an analyzer with default tunables.
    pub fn new(layout: StripLayout) -> Self {
        Self::with_config(layout, AnalyzeConfig::default())
    }

    /// Create an analyzer with explicit tunables.
    pub fn with_config(layout: StripLayout, config: AnalyzeConfig) -> Self {
        let cache = ResultCache::new(config.cache_capacity);
        let fingerprints = FingerprintLog::new(config.fingerprint_capacity);
        Self {
            layout,
            config,
            cache,
            fingerprints,
            last_reading: None,
        }
    }

    pub fn layout(&self) -> &StripLayout {
        &self.layout
    }

    pub fn config(&self) -> &AnalyzeConfig {
        &self.config
    }

    /// Analyze one prepared buffer into a calibrated reading.
    ///
    /// Identical buffers replay the memoized reading; the hysteresis
    /// anchor is updated either way.
    pub fn analyze(
        &mut self,
        img: &RgbaImage,
        calibration: &CalibrationProfile,
    ) -> Result<ScanReport, ScanError> {
        let hash = image_hash(img);

        if let Some(reading) = self.cache.get(&hash) {
            let reading = reading.clone();
            tracing::info!(%hash, "cache hit; replaying memoized reading");
            self.last_reading = Some(reading.clone());
            return Ok(ScanReport {
                reading,
                hash,
                cached: true,
                average_rgb: None,
            });
        }

        let samples = sample_pads(
            img,
            &self.layout,
            &self.config.segment,
            &calibration.white_balance,
        )?;

        let average_rgb = sample_average(img, &calibration.white_balance);

        let reading = assemble_reading(
            &self.layout,
            &self.config.stability,
            &samples,
            &calibration.offsets,
            self.last_reading.as_ref(),
        );

        tracing::info!(
            %hash,
            ph = reading.ph,
            free_cl = reading.free_cl,
            total_cl = reading.total_cl,
            "strip analyzed"
        );

        self.fingerprints.push(ScanFingerprint::from_samples(
            &hash,
            &self.layout,
            &samples,
            average_rgb,
        ));
        self.cache.put(&hash, reading.clone());
        self.last_reading = Some(reading.clone());

        Ok(ScanReport {
            reading,
            hash,
            cached: false,
            average_rgb: Some(average_rgb),
        })
    }

    /// Look up a memoized reading by content hash.
    pub fn cache_lookup(&self, hash: &str) -> Option<&ChemistryReading> {
        self.cache.get(hash)
    }

    /// The hysteresis anchor: most recent reading of this session.
    pub fn last_reading(&self) -> Option<&ChemistryReading> {
        self.last_reading.as_ref()
    }

    /// Seed the hysteresis anchor, e.g. from persisted history.
    pub fn set_previous_reading(&mut self, reading: Option<ChemistryReading>) {
        self.last_reading = reading;
    }

    /// Forget the hysteresis anchor (user cleared local data).
    pub fn reset_session(&mut self) {
        self.last_reading = None;
    }

    /// Drop memoized readings and fingerprints.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.fingerprints.clear();
    }

    /// Diagnostic fingerprints recorded so far, oldest first.
    pub fn fingerprints(&self) -> &[ScanFingerprint] {
        self.fingerprints.records()
    }
}
