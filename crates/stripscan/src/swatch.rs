//! Runtime strip layout and reference swatch tables.
//!
//! Layout JSON follows a versioned schema (`stripscan.layout.v1`): seven
//! pads in top-to-bottom physical order, each carrying its chemistry key
//! and an ordered swatch list. The embedded default is the EasyTest 7-in-1
//! reference chart.

use std::path::Path;

use serde::{Deserialize, Serialize};

const LAYOUT_SCHEMA_V1: &str = "stripscan.layout.v1";

const DEFAULT_NAME: &str = "EasyTest 7-in-1";

/// Number of reagent pads on a supported strip.
pub const PAD_COUNT: usize = 7;

/// Chemistry parameter measured by one reagent pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadKey {
    Hardness,
    FreeCl,
    Bromine,
    TotalCl,
    Cya,
    Alk,
    Ph,
}

impl PadKey {
    /// All keys in top-to-bottom physical pad order.
    pub const ALL: [PadKey; PAD_COUNT] = [
        PadKey::Hardness,
        PadKey::FreeCl,
        PadKey::Bromine,
        PadKey::TotalCl,
        PadKey::Cya,
        PadKey::Alk,
        PadKey::Ph,
    ];

    /// Stable field name used in serialized readings and CLI arguments.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Hardness => "hardness",
            Self::FreeCl => "free_cl",
            Self::Bromine => "bromine",
            Self::TotalCl => "total_cl",
            Self::Cya => "cya",
            Self::Alk => "alk",
            Self::Ph => "ph",
        }
    }
}

impl std::fmt::Display for PadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for PadKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PadKey::ALL
            .into_iter()
            .find(|k| k.code() == s)
            .ok_or_else(|| format!("unknown pad key '{s}'"))
    }
}

/// A reference calibration point: chart value plus chart RGB.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Swatch {
    pub value: f64,
    pub rgb: [u8; 3],
}

/// One reagent pad: chemistry key, display label, vertical rank, swatches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PadConfig {
    pub key: PadKey,
    pub label: String,
    /// Vertical rank on the physical strip, 0 = topmost.
    pub index: usize,
    /// Reference points ordered ascending in `value`.
    pub swatches: Vec<Swatch>,
}

/// Runtime strip layout used by the analyzer.
#[derive(Debug, Clone)]
pub struct StripLayout {
    pub name: String,
    pads: Vec<PadConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StripLayoutSpecV1 {
    schema: String,
    name: String,
    pads: Vec<PadConfig>,
}

impl StripLayout {
    /// Build a layout from explicit pads, validating the invariants the
    /// classifier relies on.
    pub fn new(name: impl Into<String>, pads: Vec<PadConfig>) -> Result<Self, String> {
        let layout = Self {
            name: name.into(),
            pads,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Pads in top-to-bottom physical order.
    pub fn pads(&self) -> &[PadConfig] {
        &self.pads
    }

    /// Look up a pad by chemistry key.
    pub fn pad(&self, key: PadKey) -> Option<&PadConfig> {
        self.pads.iter().find(|p| p.key == key)
    }

    /// Pad at the given vertical rank.
    pub fn pad_at(&self, index: usize) -> Option<&PadConfig> {
        self.pads.get(index)
    }

    /// Load a strip layout from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        let spec: StripLayoutSpecV1 = serde_json::from_str(&data)?;
        Self::from_layout_spec(spec).map_err(Into::into)
    }

    fn from_layout_spec(spec: StripLayoutSpecV1) -> Result<Self, String> {
        if spec.schema != LAYOUT_SCHEMA_V1 {
            return Err(format!(
                "unsupported layout schema '{}' (expected '{}')",
                spec.schema, LAYOUT_SCHEMA_V1
            ));
        }
        Self::new(spec.name, spec.pads)
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("layout name must not be empty".to_string());
        }

        if self.pads.len() != PAD_COUNT {
            return Err(format!(
                "layout must define exactly {PAD_COUNT} pads, got {}",
                self.pads.len()
            ));
        }

        for (i, pad) in self.pads.iter().enumerate() {
            if pad.index != i {
                return Err(format!(
                    "pad '{}' has index {} but sits at position {i}; pads must be listed top-to-bottom",
                    pad.key, pad.index
                ));
            }

            if self.pads.iter().filter(|p| p.key == pad.key).count() != 1 {
                return Err(format!("duplicate pad key '{}'", pad.key));
            }

            for pair in pad.swatches.windows(2) {
                if pair[1].value <= pair[0].value {
                    return Err(format!(
                        "pad '{}' swatch values must be strictly ascending ({} then {})",
                        pad.key, pair[0].value, pair[1].value
                    ));
                }
            }

            for swatch in &pad.swatches {
                if !swatch.value.is_finite() {
                    return Err(format!("pad '{}' has a non-finite swatch value", pad.key));
                }
            }
        }

        Ok(())
    }
}

impl Default for StripLayout {
    fn default() -> Self {
        let pads = vec![
            pad(PadKey::Hardness, "Total Hardness", 0, &HARDNESS_SWATCHES),
            pad(PadKey::FreeCl, "Free Chlorine", 1, &FREE_CL_SWATCHES),
            pad(PadKey::Bromine, "Bromine", 2, &BROMINE_SWATCHES),
            pad(PadKey::TotalCl, "Total Chlorine", 3, &TOTAL_CL_SWATCHES),
            pad(PadKey::Cya, "Cyanuric Acid", 4, &CYA_SWATCHES),
            pad(PadKey::Alk, "Total Alkalinity", 5, &ALK_SWATCHES),
            pad(PadKey::Ph, "pH", 6, &PH_SWATCHES),
        ];

        Self::new(DEFAULT_NAME, pads).expect("embedded layout must be valid")
    }
}

fn pad(key: PadKey, label: &str, index: usize, table: &[(f64, [u8; 3])]) -> PadConfig {
    PadConfig {
        key,
        label: label.to_string(),
        index,
        swatches: table
            .iter()
            .map(|&(value, rgb)| Swatch { value, rgb })
            .collect(),
    }
}

// EasyTest 7-in-1 reference chart, top-to-bottom pad order.

const HARDNESS_SWATCHES: [(f64, [u8; 3]); 6] = [
    (0.0, [111, 146, 36]),
    (25.0, [130, 113, 34]),
    (50.0, [145, 96, 30]),
    (120.0, [154, 69, 5]),
    (250.0, [191, 53, 2]),
    (425.0, [212, 58, 1]),
];

const FREE_CL_SWATCHES: [(f64, [u8; 3]); 7] = [
    (0.0, [250, 250, 250]),
    (0.5, [239, 222, 237]),
    (1.0, [233, 223, 231]),
    (3.0, [236, 175, 227]),
    (5.0, [226, 128, 213]),
    (10.0, [200, 58, 188]),
    (20.0, [177, 61, 167]),
];

const BROMINE_SWATCHES: [(f64, [u8; 3]); 7] = [
    (0.0, [248, 232, 236]),
    (1.0, [237, 228, 229]),
    (2.0, [249, 212, 218]),
    (6.0, [250, 183, 204]),
    (10.0, [254, 115, 171]),
    (20.0, [252, 96, 170]),
    (40.0, [247, 90, 157]),
];

const TOTAL_CL_SWATCHES: [(f64, [u8; 3]); 7] = [
    (0.0, [253, 247, 74]),
    (0.5, [235, 245, 73]),
    (1.0, [206, 239, 78]),
    (3.0, [166, 230, 80]),
    (5.0, [92, 223, 88]),
    (10.0, [101, 216, 155]),
    (20.0, [59, 217, 132]),
];

// Chart says 30-50 for the second point; 40 is used as its center.
const CYA_SWATCHES: [(f64, [u8; 3]); 5] = [
    (0.0, [204, 189, 152]),
    (40.0, [244, 212, 137]),
    (100.0, [231, 158, 95]),
    (150.0, [231, 128, 109]),
    (240.0, [214, 144, 180]),
];

const ALK_SWATCHES: [(f64, [u8; 3]); 7] = [
    (0.0, [254, 242, 94]),
    (40.0, [217, 240, 75]),
    (80.0, [159, 222, 114]),
    (120.0, [57, 204, 155]),
    (180.0, [25, 196, 193]),
    (240.0, [0, 179, 203]),
    (360.0, [1, 154, 221]),
];

const PH_SWATCHES: [(f64, [u8; 3]); 7] = [
    (6.0, [253, 216, 3]),
    (6.4, [254, 204, 1]),
    (6.8, [254, 176, 1]),
    (7.2, [254, 167, 0]),
    (7.6, [254, 146, 1]),
    (8.2, [255, 69, 12]),
    (9.0, [253, 3, 98]),
];
