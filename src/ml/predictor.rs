use std::sync::Arc;

use super::aligner::AlignedVector;
use super::errors::PredictionError;
use super::Regressor;

/// Guards the positional contract between an aligned vector and a model.
///
/// The regressor only sees a slice of numbers, so a vector built against a
/// different schema would silently produce garbage. Both width and column
/// order are checked before every call.
#[derive(Clone)]
pub struct Predictor {
    model: Arc<dyn Regressor>,
}

impl Predictor {
    pub fn new(model: Arc<dyn Regressor>) -> Self {
        Self { model }
    }

    pub fn expected_width(&self) -> usize {
        self.model.expected_feature_order().len()
    }

    pub fn predict(&self, vector: &AlignedVector<'_>) -> Result<f64, PredictionError> {
        let expected = self.expected_width();
        if vector.len() != expected {
            return Err(PredictionError::inference(format!(
                "model expects {expected} features, vector has {}",
                vector.len()
            )));
        }

        if let Some((idx, (got, want))) = vector
            .columns()
            .iter()
            .zip(self.model.expected_feature_order())
            .enumerate()
            .find(|(_, (got, want))| got != want)
        {
            return Err(PredictionError::inference(format!(
                "feature {idx} is '{got}' but model expects '{want}'"
            )));
        }

        let value = self.model.predict(vector.values());
        if !value.is_finite() {
            return Err(PredictionError::inference(format!(
                "model produced a non-finite prediction ({value})"
            )));
        }

        Ok(value)
    }
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("expected_width", &self.expected_width())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::aligner::align;
    use crate::ml::observation::{FieldValue, RawObservation};
    use crate::ml::schema::FeatureSchema;

    struct SumModel {
        order: Vec<String>,
    }

    impl Regressor for SumModel {
        fn expected_feature_order(&self) -> &[String] {
            &self.order
        }

        fn predict(&self, features: &[f64]) -> f64 {
            features.iter().sum()
        }
    }

    struct NanModel {
        order: Vec<String>,
    }

    impl Regressor for NanModel {
        fn expected_feature_order(&self) -> &[String] {
            &self.order
        }

        fn predict(&self, _features: &[f64]) -> f64 {
            f64::NAN
        }
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn observation() -> RawObservation {
        [("pH", FieldValue::Number(6.0)), ("Rainfall_mm", FieldValue::Number(500.0))]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_predict_matching_schema() {
        let schema = FeatureSchema::new(["pH", "Rainfall_mm"]).unwrap();
        let predictor = Predictor::new(Arc::new(SumModel {
            order: columns(&["pH", "Rainfall_mm"]),
        }));

        let alignment = align(&observation(), &schema).unwrap();
        assert_eq!(predictor.predict(&alignment.vector).unwrap(), 506.0);
    }

    #[test]
    fn test_predict_rejects_width_mismatch() {
        let schema = FeatureSchema::new(["pH", "Rainfall_mm"]).unwrap();
        let predictor = Predictor::new(Arc::new(SumModel {
            order: columns(&["pH", "Rainfall_mm", "Temperature_C"]),
        }));

        let alignment = align(&observation(), &schema).unwrap();
        let err = predictor.predict(&alignment.vector).unwrap_err();
        assert!(matches!(err, PredictionError::Inference { .. }));
        assert!(err.to_string().contains("expects 3 features"));
    }

    #[test]
    fn test_predict_rejects_reordered_schema() {
        let schema = FeatureSchema::new(["Rainfall_mm", "pH"]).unwrap();
        let predictor = Predictor::new(Arc::new(SumModel {
            order: columns(&["pH", "Rainfall_mm"]),
        }));

        let alignment = align(&observation(), &schema).unwrap();
        let err = predictor.predict(&alignment.vector).unwrap_err();
        assert!(err.to_string().contains("feature 0"));
    }

    #[test]
    fn test_predict_rejects_non_finite_output() {
        let schema = FeatureSchema::new(["pH", "Rainfall_mm"]).unwrap();
        let predictor = Predictor::new(Arc::new(NanModel {
            order: columns(&["pH", "Rainfall_mm"]),
        }));

        let alignment = align(&observation(), &schema).unwrap();
        assert!(predictor.predict(&alignment.vector).is_err());
    }
}
