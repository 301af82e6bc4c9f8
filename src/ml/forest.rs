// Random Forest Regressor Artifact
// Feature metadata around a serde-loaded aprender forest, loaded once at startup

use std::collections::BTreeMap;
use std::path::Path;

use aprender::primitives::Matrix;
use aprender::tree::RandomForestRegressor;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::errors::ModelError;
use super::schema::FeatureSchema;
use super::Regressor;

pub const MODEL_TYPE: &str = "random_forest_regressor";

#[derive(Debug, Deserialize)]
struct ForestArtifact {
    model_type: String,
    #[serde(default)]
    target: Option<String>,
    feature_names: Vec<String>,
    #[serde(default)]
    categorical_features: BTreeMap<String, Vec<String>>,
    forest: Value,
}

/// Shape of a forest that passed load-time checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ForestShape {
    n_trees: usize,
    max_depth: usize,
}

/// Random forest over a named, ordered feature schema; prediction is the mean
/// over trees
#[derive(Debug, Clone)]
pub struct ForestRegressor {
    schema: FeatureSchema,
    target: Option<String>,
    forest: RandomForestRegressor,
    shape: ForestShape,
}

impl ForestRegressor {
    /// Pair a fitted forest with the schema it was trained on.
    ///
    /// aprender does not check deserialized models, so every tree is walked
    /// here: it must be fitted, split only on in-range feature indices and
    /// carry finite thresholds and leaf values.
    pub fn new(schema: FeatureSchema, forest: RandomForestRegressor) -> Result<Self, ModelError> {
        let tree_json = serde_json::to_value(&forest)?;
        let shape = check_forest(&tree_json, schema.len())?;

        Ok(Self {
            schema,
            target: None,
            forest,
            shape,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let artifact: ForestArtifact = serde_json::from_str(json)?;

        if artifact.model_type != MODEL_TYPE {
            return Err(ModelError::invalid(format!(
                "unsupported model_type '{}', expected '{MODEL_TYPE}'",
                artifact.model_type
            )));
        }

        let schema =
            FeatureSchema::with_categories(artifact.feature_names, artifact.categorical_features)?;

        // Check the raw document first so a malformed tree is reported by
        // index rather than as an opaque serde error
        check_forest(&artifact.forest, schema.len())?;
        let forest: RandomForestRegressor = serde_json::from_value(artifact.forest)?;

        let mut regressor = Self::new(schema, forest)?;
        regressor.target = artifact.target;
        Ok(regressor)
    }

    /// Load and validate an artifact from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let regressor = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            n_features = regressor.schema.len(),
            n_trees = regressor.n_trees(),
            max_depth = regressor.max_depth(),
            "Loaded forest model"
        );
        Ok(regressor)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn n_trees(&self) -> usize {
        self.shape.n_trees
    }

    pub fn max_depth(&self) -> usize {
        self.shape.max_depth
    }
}

impl Regressor for ForestRegressor {
    fn expected_feature_order(&self) -> &[String] {
        self.schema.columns()
    }

    fn categories(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        Some(self.schema.categories())
    }

    /// NaN for a vector whose width differs from the schema
    fn predict(&self, features: &[f64]) -> f64 {
        if features.len() != self.schema.len() {
            return f64::NAN;
        }

        let row: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let Ok(x) = Matrix::from_vec(1, row.len(), row) else {
            return f64::NAN;
        };

        self.forest
            .predict(&x)
            .as_slice()
            .first()
            .map_or(f64::NAN, |&value| f64::from(value))
    }
}

fn check_forest(forest: &Value, n_features: usize) -> Result<ForestShape, ModelError> {
    let trees = forest
        .get("trees")
        .and_then(Value::as_array)
        .ok_or_else(|| ModelError::invalid("forest has no 'trees' array"))?;

    if trees.is_empty() {
        return Err(ModelError::invalid("forest has no trees"));
    }

    let mut max_depth = 0;
    for (idx, tree) in trees.iter().enumerate() {
        let root = tree
            .get("tree")
            .filter(|root| !root.is_null())
            .ok_or_else(|| ModelError::invalid(format!("tree {idx}: not fitted")))?;

        let depth = node_depth(root, n_features)
            .map_err(|e| ModelError::invalid(format!("tree {idx}: {e}")))?;
        max_depth = max_depth.max(depth);
    }

    Ok(ForestShape {
        n_trees: trees.len(),
        max_depth,
    })
}

/// Leaf depth is 0
fn node_depth(node: &Value, n_features: usize) -> Result<usize, String> {
    if let Some(leaf) = node.get("Leaf") {
        leaf.get("value")
            .and_then(Value::as_f64)
            .filter(|value| value.is_finite())
            .ok_or_else(|| "leaf value is not finite".to_string())?;
        return Ok(0);
    }

    let split = node
        .get("Node")
        .ok_or_else(|| "node is neither a split nor a leaf".to_string())?;

    let feature = split
        .get("feature_idx")
        .and_then(Value::as_u64)
        .ok_or_else(|| "split without a feature index".to_string())?;
    if feature >= n_features as u64 {
        return Err(format!(
            "split on feature {feature} but model has {n_features} features"
        ));
    }

    split
        .get("threshold")
        .and_then(Value::as_f64)
        .filter(|threshold| threshold.is_finite())
        .ok_or_else(|| format!("split on feature {feature} has a non-finite threshold"))?;

    let (Some(left), Some(right)) = (split.get("left"), split.get("right")) else {
        return Err(format!("split on feature {feature} is missing a branch"));
    };

    Ok(1 + node_depth(left, n_features)?.max(node_depth(right, n_features)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aprender::primitives::Vector;
    use serde_json::json;

    fn leaf(value: f64) -> Value {
        json!({"Leaf": {"value": value, "n_samples": 4}})
    }

    fn stump(feature: usize, threshold: f64, left: f64, right: f64) -> Value {
        json!({"Node": {
            "feature_idx": feature,
            "threshold": threshold,
            "left": leaf(left),
            "right": leaf(right)
        }})
    }

    fn artifact(feature_names: &[&str], roots: Vec<Value>) -> String {
        let trees: Vec<Value> = roots
            .into_iter()
            .map(|root| {
                json!({"tree": root, "max_depth": 3, "min_samples_split": 2, "min_samples_leaf": 1})
            })
            .collect();
        let n_trees = trees.len();

        json!({
            "model_type": MODEL_TYPE,
            "feature_names": feature_names,
            "forest": {
                "trees": trees,
                "n_estimators": n_trees,
                "max_depth": 3,
                "random_state": 7,
                "oob_indices": vec![Vec::<usize>::new(); n_trees],
                "x_train": null,
                "y_train": null
            }
        })
        .to_string()
    }

    #[test]
    fn test_tree_routes_on_threshold() {
        let forest =
            ForestRegressor::from_json(&artifact(&["pH"], vec![stump(0, 5.5, 10.0, 20.0)]))
                .unwrap();
        assert_eq!(forest.predict(&[5.5]), 10.0);
        assert_eq!(forest.predict(&[5.6]), 20.0);
        assert_eq!(forest.max_depth(), 1);
    }

    #[test]
    fn test_forest_averages_trees() {
        let json = artifact(
            &["pH", "Rainfall_mm"],
            vec![stump(0, 5.5, 10.0, 20.0), stump(1, 400.0, 14.0, 30.0)],
        );
        let forest = ForestRegressor::from_json(&json).unwrap();

        // (20 + 30) / 2
        assert!((forest.predict(&[6.0, 500.0]) - 25.0).abs() < 1e-5);
        // (10 + 14) / 2
        assert!((forest.predict(&[5.0, 300.0]) - 12.0).abs() < 1e-5);
    }

    #[test]
    fn test_wrong_width_is_nan_not_panic() {
        let json = artifact(
            &["pH", "Rainfall_mm"],
            vec![stump(1, 400.0, 14.0, 30.0)],
        );
        let forest = ForestRegressor::from_json(&json).unwrap();

        assert!(forest.predict(&[1.0]).is_nan());
        assert!(forest.predict(&[]).is_nan());
        assert!(forest.predict(&[1.0, 2.0, 3.0]).is_nan());
    }

    #[test]
    fn test_rejects_out_of_range_feature() {
        let err = ForestRegressor::from_json(&artifact(&["pH"], vec![stump(3, 1.0, 0.0, 1.0)]))
            .unwrap_err();
        assert!(err.to_string().contains("tree 0"));
        assert!(err.to_string().contains("feature 3"));
    }

    #[test]
    fn test_rejects_no_trees() {
        let err = ForestRegressor::from_json(&artifact(&["pH"], vec![])).unwrap_err();
        assert!(err.to_string().contains("no trees"));
    }

    #[test]
    fn test_rejects_unfitted_tree() {
        let err = ForestRegressor::from_json(&artifact(&["pH"], vec![Value::Null])).unwrap_err();
        assert!(err.to_string().contains("not fitted"));
    }

    #[test]
    fn test_fitted_forest_roundtrips_through_new() {
        let x = Matrix::from_vec(4, 1, vec![5.0, 5.5, 6.0, 6.5]).unwrap();
        let y = Vector::from_slice(&[21.0, 21.0, 21.0, 21.0]);
        let mut fitted = RandomForestRegressor::new(3).with_max_depth(2).with_random_state(7);
        fitted.fit(&x, &y).unwrap();

        let forest = ForestRegressor::new(FeatureSchema::new(["pH"]).unwrap(), fitted).unwrap();
        assert_eq!(forest.n_trees(), 3);
        assert!((forest.predict(&[6.2]) - 21.0).abs() < 1e-5);
    }

    #[test]
    fn test_from_json_with_metadata() {
        let json = r#"{
            "model_type": "random_forest_regressor",
            "target": "Yield_Bags_Per_Acre",
            "feature_names": ["pH", "Soil_Type_Clay", "Soil_Type_Sandy"],
            "categorical_features": {"Soil_Type": ["Clay", "Sandy"]},
            "forest": {
                "trees": [{
                    "tree": {"Node": {"feature_idx": 2, "threshold": 0.5,
                             "left": {"Leaf": {"value": 28.0, "n_samples": 6}},
                             "right": {"Leaf": {"value": 19.0, "n_samples": 4}}}},
                    "max_depth": 1, "min_samples_split": 2, "min_samples_leaf": 1
                }],
                "n_estimators": 1, "max_depth": 1, "random_state": null,
                "oob_indices": [[]], "x_train": null, "y_train": null
            }
        }"#;

        let forest = ForestRegressor::from_json(json).unwrap();
        assert_eq!(forest.n_trees(), 1);
        assert_eq!(forest.target(), Some("Yield_Bags_Per_Acre"));
        assert_eq!(forest.expected_feature_order().len(), 3);
        assert!(forest
            .categories()
            .is_some_and(|c| c.contains_key("Soil_Type")));
        assert_eq!(forest.predict(&[6.0, 0.0, 1.0]), 19.0);
    }

    #[test]
    fn test_from_json_rejects_unknown_model_type() {
        let json = r#"{
            "model_type": "linear_regression",
            "feature_names": ["pH"],
            "forest": {"trees": []}
        }"#;
        let err = ForestRegressor::from_json(json).unwrap_err();
        assert!(err.to_string().contains("linear_regression"));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = ForestRegressor::from_path("does/not/exist.json").unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }
}
