//! End-to-end tests for align -> predict -> derive

use std::sync::Arc;

use maize_yield::ml::deriver::{
    ACIDITY_ADVISORY, EARLY_PLANTING_ADVISORY, HUMIDITY_ADVISORY, IRRIGATION_ADVISORY,
    LOW_YIELD_MESSAGE, MODERATE_YIELD_MESSAGE, ORGANIC_FERTILIZER_NOTE, SOIL_ADVISORY,
};
use maize_yield::ml::{
    align, AlignmentWarning, FeatureSchema, PredictionError, RawObservation, Regressor,
    YieldCategory, YieldService,
};
use serde_json::json;

const MODEL_JSON: &str = include_str!("../models/maize_yield_forest.json");

/// Returns a fixed value but records the width it was called with
struct FixedModel {
    order: Vec<String>,
    value: f64,
}

impl Regressor for FixedModel {
    fn expected_feature_order(&self) -> &[String] {
        &self.order
    }

    fn predict(&self, features: &[f64]) -> f64 {
        assert_eq!(features.len(), self.order.len());
        self.value
    }
}

fn training_columns() -> Vec<String> {
    [
        "pH",
        "Rainfall_mm",
        "Temperature_C",
        "Humidity_%",
        "Soil_Type_Clay",
        "Soil_Type_Loam",
        "Soil_Type_Sandy",
        "Soil_Type_Silt",
        "Seed_Variety_X",
        "Planting_Date_March",
        "Fertilizer_Type_Organic",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn fixed_service(value: f64) -> YieldService {
    YieldService::new(Arc::new(FixedModel {
        order: training_columns(),
        value,
    }))
    .unwrap()
}

fn raw(value: serde_json::Value) -> RawObservation {
    RawObservation::from_json(&value).unwrap()
}

#[test]
fn test_low_yield_with_every_advisory() {
    let service = fixed_service(18.0);
    let input = raw(json!({
        "Soil_Type": "Sandy",
        "pH": 5.0,
        "Rainfall_mm": 300,
        "Humidity_%": 30,
        "Fertilizer_Type": "Organic",
        "Planting_Date": "March",
        "Seed_Variety": "X",
        "Temperature_C": 25
    }));

    let prediction = service.predict(&input).unwrap();
    let result = prediction.result;

    assert_eq!(result.category, YieldCategory::Low);
    assert_eq!(result.confidence.to_string(), "16.20 - 19.80 bags per acre");

    let expected = [
        LOW_YIELD_MESSAGE,
        SOIL_ADVISORY,
        ACIDITY_ADVISORY,
        IRRIGATION_ADVISORY,
        HUMIDITY_ADVISORY,
        ORGANIC_FERTILIZER_NOTE,
        EARLY_PLANTING_ADVISORY,
    ];
    assert_eq!(result.recommendation, expected.join(" "));

    // Advisories appear in rule order
    let positions: Vec<usize> = expected
        .iter()
        .map(|part| result.recommendation.find(part).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_category_boundaries_through_service() {
    let input = raw(json!({"pH": 6.5, "Rainfall_mm": 800, "Humidity_%": 70}));

    let at_thirty = fixed_service(30.0).predict(&input).unwrap().result;
    assert_eq!(at_thirty.category, YieldCategory::Moderate);
    assert_eq!(at_thirty.recommendation, MODERATE_YIELD_MESSAGE);

    let at_twenty = fixed_service(20.0).predict(&input).unwrap().result;
    assert_eq!(at_twenty.category, YieldCategory::Low);
}

#[test]
fn test_confidence_range_for_twenty_five() {
    let result = fixed_service(25.0)
        .predict(&raw(json!({"pH": 6.0})))
        .unwrap()
        .result;

    assert!((result.confidence.lower - 22.5).abs() < 1e-9);
    assert!((result.confidence.upper - 27.5).abs() < 1e-9);
}

#[test]
fn test_unseen_category_proceeds_with_zero() {
    let service = fixed_service(24.0);
    let input = raw(json!({"Soil_Type": "Loam2", "pH": 6.0, "Rainfall_mm": 700}));

    let prediction = service.predict(&input).unwrap();
    assert!(prediction
        .warnings
        .contains(&AlignmentWarning::UnknownFieldIgnored {
            column: "Soil_Type_Loam2".to_string()
        }));

    let schema = service.schema();
    let alignment = align(&input, schema).unwrap();
    for soil in ["Soil_Type_Clay", "Soil_Type_Loam", "Soil_Type_Sandy", "Soil_Type_Silt"] {
        assert_eq!(alignment.vector.get(soil), Some(0.0));
    }
}

#[test]
fn test_missing_ph_uses_neutral_default() {
    let result = fixed_service(26.0)
        .predict(&raw(json!({"Rainfall_mm": 900, "Humidity_%": 80})))
        .unwrap()
        .result;

    assert!(!result.recommendation.contains(ACIDITY_ADVISORY));
}

#[test]
fn test_alignment_shape_for_many_payloads() {
    let schema = FeatureSchema::new(training_columns()).unwrap();
    let payloads = [
        json!({"pH": 4.9}),
        json!({"Soil_Type": "Clay", "Seed_Variety": "Y", "Unknown": 12}),
        json!({"Humidity_%": 55, "Temperature_C": 31.5, "Planting_Date": "May"}),
        json!({"Soil_Type": "Silt", "Fertilizer_Type": "Organic", "pH": 7.1, "Rainfall_mm": 1200}),
    ];

    for payload in payloads {
        let input = raw(payload);
        let first = align(&input, &schema).unwrap();
        let second = align(&input, &schema).unwrap();

        assert_eq!(first.vector.len(), schema.len());
        assert_eq!(first.vector.columns(), schema.columns());
        assert_eq!(first.vector, second.vector);
    }
}

#[test]
fn test_empty_payload_is_schema_mismatch() {
    let err = RawObservation::from_json(&json!({})).unwrap_err();
    assert!(matches!(err, PredictionError::SchemaMismatch { .. }));
}

#[test]
fn test_bundled_forest_end_to_end() {
    let forest = maize_yield::ml::ForestRegressor::from_json(MODEL_JSON).unwrap();
    let service = YieldService::new(Arc::new(forest)).unwrap();

    let good = service
        .predict(&raw(json!({
            "Soil_Type": "Loam",
            "pH": 6.5,
            "Seed_Variety": "H614",
            "Rainfall_mm": 900,
            "Temperature_C": 24,
            "Humidity_%": 60,
            "Planting_Date": "April",
            "Fertilizer_Type": "Inorganic"
        })))
        .unwrap();
    // (33.1 + 31.7 + 32.4) / 3
    assert!((good.result.predicted_yield - 32.4).abs() < 1e-4);
    assert_eq!(good.result.category, YieldCategory::High);
    assert!(good.warnings.is_empty());

    let poor = service
        .predict(&raw(json!({
            "Soil_Type": "Sandy",
            "pH": 5.0,
            "Seed_Variety": "X",
            "Rainfall_mm": 300,
            "Temperature_C": 25,
            "Humidity_%": 30,
            "Planting_Date": "March",
            "Fertilizer_Type": "Organic"
        })))
        .unwrap();
    // (14.2 + 13.5 + 21.0) / 3
    assert!((poor.result.predicted_yield - 16.233333333).abs() < 1e-4);
    assert_eq!(poor.result.category, YieldCategory::Low);
    assert_eq!(
        poor.warnings,
        vec![AlignmentWarning::UnknownFieldIgnored {
            column: "Seed_Variety_X".to_string()
        }]
    );
}
