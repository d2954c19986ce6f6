//! White-balance factors and per-parameter calibration offsets.
//!
//! A profile is read once at the start of an analysis pass and treated as a
//! snapshot for the pass's duration. The core never mutates it; profiles
//! change only through an explicit calibration action (sampling a
//! known-neutral pixel) or the external `calibrate` tool.

use std::path::Path;

use serde::{Deserialize, Serialize};

const CALIBRATION_SCHEMA_V1: &str = "stripscan.calibration.v1";

/// Per-channel white-balance divisors estimated from a neutral sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhiteBalance {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Default for WhiteBalance {
    fn default() -> Self {
        Self::identity()
    }
}

impl WhiteBalance {
    /// Neutral factors: raw channel values pass through unchanged.
    pub const fn identity() -> Self {
        Self {
            r: 1.0,
            g: 1.0,
            b: 1.0,
        }
    }

    /// Estimate factors from a pixel known to be neutral white/gray.
    ///
    /// Each factor is the channel value over the channel mean, so dividing
    /// raw channels by the factors neutralizes the sampled cast. A black
    /// sample carries no cast information and yields identity.
    pub fn from_neutral_sample(r: u8, g: u8, b: u8) -> Self {
        let mean = (r as f64 + g as f64 + b as f64) / 3.0;
        if mean <= 0.0 {
            return Self::identity();
        }
        Self {
            r: r as f64 / mean,
            g: g as f64 / mean,
            b: b as f64 / mean,
        }
    }

    /// Apply the correction to one raw RGB triple.
    #[inline]
    pub fn correct(&self, rgb: [u8; 3]) -> [f64; 3] {
        [
            rgb[0] as f64 / self.r,
            rgb[1] as f64 / self.g,
            rgb[2] as f64 / self.b,
        ]
    }

    fn validate(&self) -> Result<(), String> {
        for (name, v) in [("r", self.r), ("g", self.g), ("b", self.b)] {
            if !v.is_finite() || v <= 0.0 {
                return Err(format!(
                    "white balance factor {name} must be finite and > 0, got {v}"
                ));
            }
        }
        Ok(())
    }
}

/// Additive numeric offsets applied after classification.
///
/// Only pH, alkalinity, cyanuric acid, and hardness are offset-capable;
/// chlorine and bromine are never adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalOffsets {
    pub ph: f64,
    pub alk: f64,
    pub cya: f64,
    pub hardness: f64,
}

/// Process-wide calibration state injected into each analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationProfile {
    pub white_balance: WhiteBalance,
    pub offsets: CalOffsets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CalibrationSpecV1 {
    schema: String,
    #[serde(default)]
    white_balance: WhiteBalance,
    #[serde(default)]
    offsets: CalOffsets,
}

impl CalibrationProfile {
    /// Load a calibration profile from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        let spec: CalibrationSpecV1 = serde_json::from_str(&data)?;
        Self::from_spec(spec).map_err(Into::into)
    }

    /// Write a calibration profile to a JSON file.
    pub fn to_json_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let spec = CalibrationSpecV1 {
            schema: CALIBRATION_SCHEMA_V1.to_string(),
            white_balance: self.white_balance,
            offsets: self.offsets,
        };
        let json = serde_json::to_string_pretty(&spec)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn from_spec(spec: CalibrationSpecV1) -> Result<Self, String> {
        if spec.schema != CALIBRATION_SCHEMA_V1 {
            return Err(format!(
                "unsupported calibration schema '{}' (expected '{}')",
                spec.schema, CALIBRATION_SCHEMA_V1
            ));
        }
        spec.white_balance.validate()?;
        Ok(Self {
            white_balance: spec.white_balance,
            offsets: spec.offsets,
        })
    }
}
