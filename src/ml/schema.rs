// Feature Schema
// Ordered training columns of a fitted model, plus optional categorical metadata

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::errors::ModelError;

/// The ordered set of columns a model was fit on.
///
/// Categorical attributes appear already one-hot expanded
/// (`Soil_Type_Clay`, `Soil_Type_Loam`, ...). The optional `categories` map
/// records which raw attributes were categorical and which values were seen
/// at training time; it only feeds diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SchemaRepr", into = "SchemaRepr")]
pub struct FeatureSchema {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
    categories: BTreeMap<String, Vec<String>>,
}

#[derive(Serialize, Deserialize)]
struct SchemaRepr {
    columns: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    categories: BTreeMap<String, Vec<String>>,
}

impl TryFrom<SchemaRepr> for FeatureSchema {
    type Error = ModelError;

    fn try_from(repr: SchemaRepr) -> Result<Self, Self::Error> {
        FeatureSchema::with_categories(repr.columns, repr.categories)
    }
}

impl From<FeatureSchema> for SchemaRepr {
    fn from(schema: FeatureSchema) -> Self {
        SchemaRepr {
            columns: schema.columns,
            categories: schema.categories,
        }
    }
}

impl FeatureSchema {
    pub fn new<I, S>(columns: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_categories(columns, BTreeMap::new())
    }

    /// Build a schema with categorical declarations.
    ///
    /// Every declared `attribute -> value` pair must have a matching
    /// `"{attribute}_{value}"` column.
    pub fn with_categories<I, S>(
        columns: I,
        categories: BTreeMap<String, Vec<String>>,
    ) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(ModelError::invalid("feature schema has no columns"));
        }

        let mut positions = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            if column.is_empty() {
                return Err(ModelError::invalid(format!(
                    "feature column {idx} has an empty name"
                )));
            }
            if positions.insert(column.clone(), idx).is_some() {
                return Err(ModelError::invalid(format!(
                    "duplicate feature column '{column}'"
                )));
            }
        }

        for (attribute, values) in &categories {
            for value in values {
                let column = one_hot_column(attribute, value);
                if !positions.contains_key(&column) {
                    return Err(ModelError::invalid(format!(
                        "categorical value '{value}' of '{attribute}' has no column '{column}'"
                    )));
                }
            }
        }

        Ok(Self {
            columns,
            positions,
            categories,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn categories(&self) -> &BTreeMap<String, Vec<String>> {
        &self.categories
    }

    pub fn is_categorical(&self, attribute: &str) -> bool {
        self.categories.contains_key(attribute)
    }

    /// True if the column is the one-hot indicator of a declared categorical value
    pub fn is_indicator_column(&self, column: &str) -> bool {
        self.categories.iter().any(|(attribute, values)| {
            values
                .iter()
                .any(|value| one_hot_column(attribute, value) == column)
        })
    }
}

/// Column name produced by one-hot encoding `attribute = value`
pub fn one_hot_column(attribute: &str, value: &str) -> String {
    format!("{attribute}_{value}")
}
