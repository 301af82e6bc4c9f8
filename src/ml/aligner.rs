//! Feature alignment
//!
//! Turns a `RawObservation` into the positional vector a model was trained on:
//!
//! 1. numeric attribute `a` becomes column `a`
//! 2. string attribute `a = v` becomes indicator column `a_v = 1.0`
//! 3. schema columns that were not produced are zero-filled
//! 4. produced columns outside the schema are dropped
//! 5. values are laid out in schema order
//!
//! Step 4 is where unseen categories (a typo such as `Soil_Type = "Loam2"`)
//! disappear. The drop is not an error, but every dropped column is reported
//! as an `AlignmentWarning` so the loss of signal stays visible.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::warn;

use super::errors::PredictionError;
use super::observation::{FieldValue, RawObservation};
use super::schema::{one_hot_column, FeatureSchema};

/// Observation expanded into column -> value, before projection onto a schema
pub type EncodedRow = BTreeMap<String, f64>;

/// A feature vector laid out in exactly the order of the schema it was aligned to
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedVector<'a> {
    schema: &'a FeatureSchema,
    values: Vec<f64>,
}

impl<'a> AlignedVector<'a> {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn columns(&self) -> &'a [String] {
        self.schema.columns()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.schema.position(column).map(|idx| self.values[idx])
    }
}

/// Non-fatal diagnostics collected during alignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlignmentWarning {
    /// A generated column the model was never trained on; its value was dropped
    UnknownFieldIgnored { column: String },
    /// A numeric schema column the request did not supply; filled with 0
    MissingFeature { column: String },
}

impl fmt::Display for AlignmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentWarning::UnknownFieldIgnored { column } => {
                write!(f, "column '{column}' is not part of the model schema and was ignored")
            }
            AlignmentWarning::MissingFeature { column } => {
                write!(f, "feature '{column}' was not supplied and defaulted to 0")
            }
        }
    }
}

/// Output of `align`: the vector plus whatever was dropped or zero-filled
#[derive(Debug, Clone)]
pub struct Alignment<'a> {
    pub vector: AlignedVector<'a>,
    pub warnings: Vec<AlignmentWarning>,
}

/// One-hot encode every string attribute; numeric attributes pass through.
///
/// A raw key that spells out a generated indicator column (`Soil_Type_Clay`
/// next to `Soil_Type = "Clay"`) is ambiguous and rejected.
pub fn encode(raw: &RawObservation) -> Result<EncodedRow, PredictionError> {
    let mut row = EncodedRow::new();
    for (attribute, value) in raw.iter() {
        let (column, encoded) = match value {
            FieldValue::Number(n) => (attribute.clone(), *n),
            FieldValue::Text(s) => (one_hot_column(attribute, s), 1.0),
        };
        if row.contains_key(&column) {
            return Err(PredictionError::schema_mismatch(format!(
                "column '{column}' is produced by more than one field"
            )));
        }
        row.insert(column, encoded);
    }
    Ok(row)
}

/// Project a raw observation onto `schema`.
///
/// The returned vector always has `schema.len()` values in schema order.
pub fn align<'a>(
    raw: &RawObservation,
    schema: &'a FeatureSchema,
) -> Result<Alignment<'a>, PredictionError> {
    if raw.is_empty() {
        return Err(PredictionError::schema_mismatch("observation is empty"));
    }

    let encoded = encode(raw)?;
    let mut values = vec![0.0; schema.len()];
    let mut warnings = Vec::new();

    for (column, value) in &encoded {
        match schema.position(column) {
            Some(idx) => values[idx] = *value,
            None => {
                warn!(column = %column, "Dropping column not present in model schema");
                warnings.push(AlignmentWarning::UnknownFieldIgnored {
                    column: column.clone(),
                });
            }
        }
    }

    // Without categorical metadata every absent indicator column would look
    // like a missing numeric feature, so only report when it is declared.
    if !schema.categories().is_empty() {
        for column in schema.columns() {
            if !encoded.contains_key(column) && !schema.is_indicator_column(column) {
                warn!(column = %column, "Schema feature missing from request, defaulting to 0");
                warnings.push(AlignmentWarning::MissingFeature {
                    column: column.clone(),
                });
            }
        }
    }

    Ok(Alignment {
        vector: AlignedVector { schema, values },
        warnings,
    })
}
