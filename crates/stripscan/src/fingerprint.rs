//! Per-scan pad color fingerprints for offline calibration review.
//!
//! Write-only from the core's perspective: the analyzer appends one record
//! per fresh scan and external tooling reads them back to judge swatch
//! tables and lighting. Colors are rounded so the records stay compact and
//! diff-friendly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::sample::PadColorSample;
use crate::swatch::{PadKey, StripLayout};

/// Default fingerprint log capacity in records.
pub const DEFAULT_FINGERPRINT_CAPACITY: usize = 120;

/// Rounded color of one pad in one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadFingerprintEntry {
    pub key: PadKey,
    pub r: i32,
    pub g: i32,
    pub b: i32,
    /// Sample variance, two decimals.
    pub variance: f64,
}

/// One scan's diagnostic color record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFingerprint {
    /// Content hash of the analyzed buffer.
    pub hash: String,
    /// Rounded average-stripe RGB.
    pub average_rgb: [i32; 3],
    /// Per-pad rounded colors in physical pad order.
    pub pads: Vec<PadFingerprintEntry>,
}

impl ScanFingerprint {
    /// Build a record from one pass's samples, in layout pad order.
    pub fn from_samples(
        hash: &str,
        layout: &StripLayout,
        samples: &HashMap<PadKey, PadColorSample>,
        average_rgb: [f64; 3],
    ) -> Self {
        let pads = layout
            .pads()
            .iter()
            .filter_map(|pad| {
                samples.get(&pad.key).map(|s| PadFingerprintEntry {
                    key: pad.key,
                    r: s.r.round() as i32,
                    g: s.g.round() as i32,
                    b: s.b.round() as i32,
                    variance: (s.variance * 100.0).round() / 100.0,
                })
            })
            .collect();

        Self {
            hash: hash.to_string(),
            average_rgb: [
                average_rgb[0].round() as i32,
                average_rgb[1].round() as i32,
                average_rgb[2].round() as i32,
            ],
            pads,
        }
    }
}

/// Capacity-bounded append-only fingerprint log, oldest records dropped
/// first.
#[derive(Debug, Clone)]
pub struct FingerprintLog {
    records: Vec<ScanFingerprint>,
    capacity: usize,
}

impl Default for FingerprintLog {
    fn default() -> Self {
        Self::new(DEFAULT_FINGERPRINT_CAPACITY)
    }
}

impl FingerprintLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            capacity,
        }
    }

    /// Append a record, dropping oldest records past capacity.
    pub fn push(&mut self, record: ScanFingerprint) {
        self.records.push(record);
        if self.records.len() > self.capacity {
            let excess = self.records.len() - self.capacity;
            self.records.drain(..excess);
        }
    }

    /// Records oldest-first.
    pub fn records(&self) -> &[ScanFingerprint] {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hash: &str) -> ScanFingerprint {
        ScanFingerprint {
            hash: hash.to_string(),
            average_rgb: [150, 150, 150],
            pads: Vec::new(),
        }
    }

    #[test]
    fn from_samples_rounds_and_orders_pads() {
        let layout = StripLayout::default();
        let mut samples = HashMap::new();
        for (i, key) in PadKey::ALL.into_iter().enumerate() {
            samples.insert(
                key,
                PadColorSample {
                    r: 100.4 + i as f64,
                    g: 50.5,
                    b: 25.6,
                    variance: 1.234,
                },
            );
        }

        let fp = ScanFingerprint::from_samples(
            "00c0ffee",
            &layout,
            &samples,
            [149.5, 150.4, 151.0],
        );

        assert_eq!(fp.hash, "00c0ffee");
        assert_eq!(fp.average_rgb, [150, 150, 151]);
        assert_eq!(fp.pads.len(), 7);
        let keys: Vec<PadKey> = fp.pads.iter().map(|p| p.key).collect();
        assert_eq!(keys, PadKey::ALL);
        assert_eq!(fp.pads[0].r, 100);
        assert_eq!(fp.pads[1].r, 101);
        assert_eq!(fp.pads[0].g, 51);
        assert_eq!(fp.pads[0].variance, 1.23);
    }

    #[test]
    fn missing_pads_are_skipped() {
        let layout = StripLayout::default();
        let mut samples = HashMap::new();
        samples.insert(
            PadKey::Ph,
            PadColorSample {
                r: 1.0,
                g: 2.0,
                b: 3.0,
                variance: 0.0,
            },
        );
        let fp = ScanFingerprint::from_samples("deadbeef", &layout, &samples, [0.0, 0.0, 0.0]);
        assert_eq!(fp.pads.len(), 1);
        assert_eq!(fp.pads[0].key, PadKey::Ph);
    }

    #[test]
    fn log_drops_oldest_past_capacity() {
        let mut log = FingerprintLog::new(3);
        for i in 0..5 {
            log.push(record(&format!("hash{i}")));
        }
        assert_eq!(log.records().len(), 3);
        assert_eq!(log.records()[0].hash, "hash2");
        assert_eq!(log.records()[2].hash, "hash4");
    }

    #[test]
    fn clear_empties_the_log() {
        let mut log = FingerprintLog::default();
        log.push(record("a"));
        log.clear();
        assert!(log.records().is_empty());
    }
}
