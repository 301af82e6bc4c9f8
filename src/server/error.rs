use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::{history::HistoryError, ml::PredictionError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid query string: {0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Prediction(#[from] PredictionError),

    #[error("Prediction history is not enabled on this server")]
    HistoryDisabled,

    #[error(transparent)]
    History(#[from] HistoryError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedPayload(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidQuery(rejection.body_text())
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            AppError::Prediction(PredictionError::SchemaMismatch { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Prediction(PredictionError::Inference { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::HistoryDisabled => StatusCode::SERVICE_UNAVAILABLE,
            AppError::History(HistoryError::InvalidIdentity(_)) => StatusCode::BAD_REQUEST,
            AppError::History(HistoryError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::MalformedPayload(_) => "schema_mismatch",
            AppError::InvalidQuery(_) => "invalid_query",
            AppError::Prediction(e) => e.kind(),
            AppError::HistoryDisabled => "history_disabled",
            AppError::History(HistoryError::InvalidIdentity(_)) => "invalid_identity",
            AppError::History(HistoryError::Database(_)) => "storage_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(error = %self, "Request rejected");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}
