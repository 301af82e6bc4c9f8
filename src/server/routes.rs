use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State as AxumState,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    history::{validate_identity, PredictionRecord},
    ml::{AlignmentWarning, RawObservation, YieldCategory},
};

use super::{error::AppError, state::State};

pub const WELCOME_MESSAGE: &str = "Welcome to the Maize Yield Prediction API!";

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    pub username: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predicted_yield: f64,
    pub confidence_range: String,
    pub category: YieldCategory,
    pub recommendation: String,
    pub input_summary: RawObservation,
    #[serde(default, skip_serializing_if = "Vec::is_empty", skip_deserializing)]
    pub warnings: Vec<AlignmentWarning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Uuid>,
}

pub async fn home_handler() -> Json<Value> {
    Json(json!({ "message": WELCOME_MESSAGE }))
}

pub async fn health_handler(AxumState(state): AxumState<Arc<State>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model_features": state.service.schema().len(),
        "history_enabled": state.history.is_some(),
    }))
}

pub async fn predict_handler(
    AxumState(state): AxumState<Arc<State>>,
    query: Result<Query<PredictQuery>, QueryRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    let Query(query) = query?;
    let Json(body) = payload?;
    let raw = RawObservation::from_json(&body)?;

    let identity = match query.username.as_deref() {
        Some(name) => Some(validate_identity(name)?.to_string()),
        None => None,
    };

    let prediction = state.service.predict(&raw)?;

    let record_id = match (&identity, &state.history) {
        (Some(identity), Some(history)) => {
            let record = history
                .record(identity, &raw.crop(), &prediction.result)
                .await?;
            Some(record.id)
        }
        (Some(identity), None) => {
            warn!(identity = %identity, "History disabled, prediction not stored");
            None
        }
        (None, _) => None,
    };

    let result = prediction.result;
    Ok(Json(PredictResponse {
        predicted_yield: result.predicted_yield,
        confidence_range: result.confidence.to_string(),
        category: result.category,
        recommendation: result.recommendation,
        input_summary: raw,
        warnings: prediction.warnings,
        record_id,
    }))
}

pub async fn history_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(username): Path<String>,
) -> Result<Json<Vec<PredictionRecord>>, AppError> {
    let history = state.history.as_ref().ok_or(AppError::HistoryDisabled)?;

    let records = history.for_identity(&username).await?;
    info!(identity = %username, count = records.len(), "Fetched prediction history");

    Ok(Json(records))
}
