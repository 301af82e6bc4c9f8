//! Result derivation
//!
//! Maps a scalar yield estimate (bags per acre) to the presentation fields
//! returned to callers: a confidence band, a category and a recommendation.
//!
//! The confidence band is a fixed ±10% around the estimate. It is an
//! approximation for display, not a calibrated statistical interval.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::observation::{CropObservation, RawObservation};

const BAND_FRACTION: f64 = 0.10;
const HIGH_YIELD_ABOVE: f64 = 30.0;
const MODERATE_YIELD_ABOVE: f64 = 20.0;

const ACIDIC_PH_BELOW: f64 = 5.5;
const LOW_RAINFALL_BELOW_MM: f64 = 400.0;
const LOW_HUMIDITY_BELOW_PCT: f64 = 40.0;

const DEFAULT_PH: f64 = 7.0;
const DEFAULT_RAINFALL_MM: f64 = 0.0;
const DEFAULT_HUMIDITY_PCT: f64 = 100.0;

pub const HIGH_YIELD_MESSAGE: &str =
    "Excellent growing conditions. Maintain current practices and monitor for pests.";
pub const MODERATE_YIELD_MESSAGE: &str =
    "Moderate yield expected. Consider optimizing fertilizer application and irrigation.";
pub const LOW_YIELD_MESSAGE: &str =
    "Low yield expected. Review soil fertility, seed selection and water management.";

pub const SOIL_ADVISORY: &str =
    "Sandy and silty soils hold few nutrients; add compost or manure to build organic matter.";
pub const ACIDITY_ADVISORY: &str =
    "Soil is acidic (pH below 5.5); apply agricultural lime to raise pH.";
pub const IRRIGATION_ADVISORY: &str =
    "Rainfall is below 400 mm; plan supplementary irrigation.";
pub const HUMIDITY_ADVISORY: &str =
    "Humidity is below 40%; expect moisture stress and consider mulching to retain soil water.";
pub const ORGANIC_FERTILIZER_NOTE: &str =
    "Organic fertilizer releases nutrients slowly; top-dress with nitrogen if leaves yellow.";
pub const EARLY_PLANTING_ADVISORY: &str =
    "March planting is early; make sure the rains have set in before sowing.";

/// Three-tier yield classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YieldCategory {
    #[serde(rename = "High Yield")]
    High,
    #[serde(rename = "Moderate Yield")]
    Moderate,
    #[serde(rename = "Low Yield")]
    Low,
}

impl YieldCategory {
    /// `> 30` is High, `(20, 30]` is Moderate, `<= 20` is Low
    pub fn from_yield(yield_value: f64) -> Self {
        if yield_value > HIGH_YIELD_ABOVE {
            YieldCategory::High
        } else if yield_value > MODERATE_YIELD_ABOVE {
            YieldCategory::Moderate
        } else {
            YieldCategory::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            YieldCategory::High => "High Yield",
            YieldCategory::Moderate => "Moderate Yield",
            YieldCategory::Low => "Low Yield",
        }
    }

    pub fn base_recommendation(&self) -> &'static str {
        match self {
            YieldCategory::High => HIGH_YIELD_MESSAGE,
            YieldCategory::Moderate => MODERATE_YIELD_MESSAGE,
            YieldCategory::Low => LOW_YIELD_MESSAGE,
        }
    }
}

impl fmt::Display for YieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for YieldCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "High Yield" => Ok(YieldCategory::High),
            "Moderate Yield" => Ok(YieldCategory::Moderate),
            "Low Yield" => Ok(YieldCategory::Low),
            other => Err(format!("unknown yield category '{other}'")),
        }
    }
}

/// Symmetric ±10% band around the estimate, rounded to 2 decimals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceRange {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceRange {
    pub fn around(yield_value: f64) -> Self {
        Self {
            lower: round2(yield_value * (1.0 - BAND_FRACTION)),
            upper: round2(yield_value * (1.0 + BAND_FRACTION)),
        }
    }
}

impl fmt::Display for ConfidenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} - {:.2} bags per acre", self.lower, self.upper)
    }
}

/// Presentation fields derived from one yield estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_yield: f64,
    pub confidence: ConfidenceRange,
    pub category: YieldCategory,
    pub recommendation: String,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rule annotations in their fixed output order
fn advisories(crop: &CropObservation) -> Vec<&'static str> {
    let mut notes = Vec::new();

    if matches!(crop.soil_type.as_deref(), Some("Sandy") | Some("Silt")) {
        notes.push(SOIL_ADVISORY);
    }
    if crop.ph.unwrap_or(DEFAULT_PH) < ACIDIC_PH_BELOW {
        notes.push(ACIDITY_ADVISORY);
    }
    if crop.rainfall_mm.unwrap_or(DEFAULT_RAINFALL_MM) < LOW_RAINFALL_BELOW_MM {
        notes.push(IRRIGATION_ADVISORY);
    }
    if crop.humidity_pct.unwrap_or(DEFAULT_HUMIDITY_PCT) < LOW_HUMIDITY_BELOW_PCT {
        notes.push(HUMIDITY_ADVISORY);
    }
    if crop.fertilizer_type.as_deref() == Some("Organic") {
        notes.push(ORGANIC_FERTILIZER_NOTE);
    }
    if crop.planting_date.as_deref() == Some("March") {
        notes.push(EARLY_PLANTING_ADVISORY);
    }

    notes
}

/// Derive the presentation fields for `yield_value` given the request that produced it
pub fn derive(yield_value: f64, raw: &RawObservation) -> PredictionResult {
    let category = YieldCategory::from_yield(yield_value);

    let mut parts = vec![category.base_recommendation()];
    parts.extend(advisories(&raw.crop()));

    PredictionResult {
        predicted_yield: yield_value,
        confidence: ConfidenceRange::around(yield_value),
        category,
        recommendation: parts.join(" "),
    }
}
