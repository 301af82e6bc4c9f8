// Yield Prediction Service
// Align -> predict -> derive pipeline over an immutable schema/model pair

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::aligner::{align, AlignmentWarning};
use super::deriver::{derive, PredictionResult};
use super::errors::{ModelError, PredictionError};
use super::observation::RawObservation;
use super::predictor::Predictor;
use super::schema::FeatureSchema;
use super::Regressor;

/// Result of one request: derived fields plus alignment diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub result: PredictionResult,
    pub warnings: Vec<AlignmentWarning>,
}

/// Loaded once at startup and shared read-only across requests
#[derive(Debug)]
pub struct YieldService {
    schema: FeatureSchema,
    predictor: Predictor,
}

impl YieldService {
    /// Build a service whose schema is taken from the model itself
    pub fn new(model: Arc<dyn Regressor>) -> Result<Self, PredictionError> {
        let categories = model.categories().cloned().unwrap_or_default();
        let schema = FeatureSchema::with_categories(
            model.expected_feature_order().iter().cloned(),
            categories,
        )
        .map_err(|e| PredictionError::inference(format!("model feature order is unusable: {e}")))?;

        Self::with_schema(schema, model)
    }

    /// Pair an externally persisted schema with a model; they must agree exactly
    pub fn with_schema(
        schema: FeatureSchema,
        model: Arc<dyn Regressor>,
    ) -> Result<Self, PredictionError> {
        if schema.columns() != model.expected_feature_order() {
            return Err(PredictionError::inference(format!(
                "schema has {} columns but model expects {} in a different layout",
                schema.len(),
                model.expected_feature_order().len()
            )));
        }

        Ok(Self {
            schema,
            predictor: Predictor::new(model),
        })
    }

    /// Load a forest artifact from disk and wrap it in a service
    pub fn from_model_path(path: impl AsRef<std::path::Path>) -> Result<Self, ModelError> {
        let forest = super::forest::ForestRegressor::from_path(path)?;
        let schema = forest.schema().clone();
        Self::with_schema(schema, Arc::new(forest))
            .map_err(|e| ModelError::invalid(e.to_string()))
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn predict(&self, raw: &RawObservation) -> Result<Prediction, PredictionError> {
        let alignment = align(raw, &self.schema)?;
        debug!(features = ?alignment.vector.values(), "Aligned feature vector");

        let yield_value = self.predictor.predict(&alignment.vector)?;
        let result = derive(yield_value, raw);

        info!(
            predicted_yield = result.predicted_yield,
            category = %result.category,
            warnings = alignment.warnings.len(),
            "Prediction completed"
        );

        Ok(Prediction {
            result,
            warnings: alignment.warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::deriver::YieldCategory;
    use serde_json::json;

    struct ConstantModel {
        order: Vec<String>,
        value: f64,
    }

    impl Regressor for ConstantModel {
        fn expected_feature_order(&self) -> &[String] {
            &self.order
        }

        fn predict(&self, _features: &[f64]) -> f64 {
            self.value
        }
    }

    fn model(value: f64) -> Arc<dyn Regressor> {
        Arc::new(ConstantModel {
            order: vec!["pH".to_string(), "Soil_Type_Clay".to_string()],
            value,
        })
    }

    #[test]
    fn test_service_predicts() {
        let service = YieldService::new(model(31.0)).unwrap();
        let raw = RawObservation::from_json(&json!({"Soil_Type": "Clay", "pH": 6.4})).unwrap();

        let prediction = service.predict(&raw).unwrap();
        assert_eq!(prediction.result.category, YieldCategory::High);
        assert!(prediction.warnings.is_empty());
    }

    #[test]
    fn test_service_reports_dropped_columns() {
        let service = YieldService::new(model(25.0)).unwrap();
        let raw = RawObservation::from_json(&json!({"Soil_Type": "Chalk", "pH": 6.4})).unwrap();

        let prediction = service.predict(&raw).unwrap();
        assert_eq!(prediction.warnings.len(), 1);
        assert_eq!(prediction.result.category, YieldCategory::Moderate);
    }

    #[test]
    fn test_with_schema_rejects_mismatched_pair() {
        let schema = FeatureSchema::new(["Soil_Type_Clay", "pH"]).unwrap();
        let err = YieldService::with_schema(schema, model(25.0)).unwrap_err();
        assert!(matches!(err, PredictionError::Inference { .. }));
    }

    #[test]
    fn test_service_rejects_empty_observation() {
        let service = YieldService::new(model(25.0)).unwrap();
        let err = service.predict(&RawObservation::default()).unwrap_err();
        assert!(matches!(err, PredictionError::SchemaMismatch { .. }));
    }
}
