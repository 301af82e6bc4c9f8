//! Request payload types
//!
//! A `RawObservation` is the validated, schema-less form of a request body: a
//! flat mapping of attribute name to a string or numeric value. The eight
//! attributes the advisory rules care about are also lifted into a typed
//! `CropObservation` at the boundary so a wrongly typed field is rejected
//! before it reaches the model.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::PredictionError;

pub const SOIL_TYPE: &str = "Soil_Type";
pub const PH: &str = "pH";
pub const SEED_VARIETY: &str = "Seed_Variety";
pub const RAINFALL_MM: &str = "Rainfall_mm";
pub const TEMPERATURE_C: &str = "Temperature_C";
pub const HUMIDITY_PCT: &str = "Humidity_%";
pub const PLANTING_DATE: &str = "Planting_Date";
pub const FERTILIZER_TYPE: &str = "Fertilizer_Type";

const NUMERIC_FIELDS: [&str; 4] = [PH, RAINFALL_MM, TEMPERATURE_C, HUMIDITY_PCT];
const TEXT_FIELDS: [&str; 4] = [SOIL_TYPE, SEED_VARIETY, PLANTING_DATE, FERTILIZER_TYPE];

/// A single attribute value as submitted by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Number(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Flat attribute -> value mapping taken from an untrusted request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawObservation(BTreeMap<String, FieldValue>);

impl RawObservation {
    /// Validate an arbitrary JSON value into a flat observation.
    ///
    /// Rejects anything that is not a non-empty object of strings and finite
    /// numbers, and any known attribute carrying the wrong type.
    pub fn from_json(value: &Value) -> Result<Self, PredictionError> {
        let object = value.as_object().ok_or_else(|| {
            PredictionError::schema_mismatch("payload must be a flat JSON object")
        })?;

        if object.is_empty() {
            return Err(PredictionError::schema_mismatch("payload is empty"));
        }

        let mut fields = BTreeMap::new();
        for (key, raw) in object {
            if key.is_empty() {
                return Err(PredictionError::schema_mismatch(
                    "attribute names must not be empty",
                ));
            }

            let field = match raw {
                Value::String(s) => FieldValue::Text(s.clone()),
                Value::Number(n) => match n.as_f64() {
                    Some(v) if v.is_finite() => FieldValue::Number(v),
                    _ => {
                        return Err(PredictionError::schema_mismatch(format!(
                            "attribute '{key}' is not a finite number"
                        )))
                    }
                },
                other => {
                    return Err(PredictionError::schema_mismatch(format!(
                        "attribute '{key}' must be a string or number, got {}",
                        json_type_name(other)
                    )))
                }
            };
            fields.insert(key.clone(), field);
        }

        let observation = Self(fields);
        observation.check_known_field_types()?;
        Ok(observation)
    }

    fn check_known_field_types(&self) -> Result<(), PredictionError> {
        for name in NUMERIC_FIELDS {
            if let Some(FieldValue::Text(v)) = self.0.get(name) {
                return Err(PredictionError::schema_mismatch(format!(
                    "attribute '{name}' must be numeric, got \"{v}\""
                )));
            }
        }
        for name in TEXT_FIELDS {
            if let Some(FieldValue::Number(v)) = self.0.get(name) {
                return Err(PredictionError::schema_mismatch(format!(
                    "attribute '{name}' must be a string, got {v}"
                )));
            }
        }
        Ok(())
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(FieldValue::as_number)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(FieldValue::as_text)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    /// Typed view of the attributes the advisory rules read
    pub fn crop(&self) -> CropObservation {
        CropObservation {
            soil_type: self.text(SOIL_TYPE).map(str::to_string),
            ph: self.number(PH),
            seed_variety: self.text(SEED_VARIETY).map(str::to_string),
            rainfall_mm: self.number(RAINFALL_MM),
            temperature_c: self.number(TEMPERATURE_C),
            humidity_pct: self.number(HUMIDITY_PCT),
            planting_date: self.text(PLANTING_DATE).map(str::to_string),
            fertilizer_type: self.text(FERTILIZER_TYPE).map(str::to_string),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for RawObservation {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The logical request fields, all optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CropObservation {
    pub soil_type: Option<String>,
    pub ph: Option<f64>,
    pub seed_variety: Option<String>,
    pub rainfall_mm: Option<f64>,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub planting_date: Option<String>,
    pub fertilizer_type: Option<String>,
}
