//! Yield model integration
//! Feature alignment, forest inference and result derivation

pub mod aligner;
pub mod deriver;
pub mod errors;
pub mod forest;
pub mod observation;
pub mod predictor;
pub mod schema;
pub mod service;

use std::collections::BTreeMap;

// Re-export commonly used types
pub use aligner::{align, AlignedVector, Alignment, AlignmentWarning};
pub use deriver::{derive, ConfidenceRange, PredictionResult, YieldCategory};
pub use errors::{ModelError, PredictionError};
pub use forest::ForestRegressor;
pub use observation::{CropObservation, FieldValue, RawObservation};
pub use predictor::Predictor;
pub use schema::FeatureSchema;
pub use service::{Prediction, YieldService};

/// A fitted regression model as seen by the serving layer.
///
/// Purely positional: `predict` receives values in exactly the order given by
/// `expected_feature_order` and has no notion of column names.
pub trait Regressor: Send + Sync {
    fn expected_feature_order(&self) -> &[String];

    /// Must not panic on a slice of the wrong width; returning NaN lets the
    /// caller report it as an inference error.
    fn predict(&self, features: &[f64]) -> f64;

    /// Categorical attributes and the values seen at training time, if known
    fn categories(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        None
    }
}
