// Prediction History
// Append-only store of served predictions, keyed by an opaque caller identity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::ml::{CropObservation, PredictionResult};

pub const MAX_IDENTITY_LEN: usize = 100;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub identity: String,
    pub soil_type: Option<String>,
    pub ph: Option<f64>,
    pub seed_variety: Option<String>,
    pub rainfall_mm: Option<f64>,
    pub temperature_c: Option<f64>,
    pub humidity_percent: Option<f64>,
    pub planting_date: Option<String>,
    pub fertilizer_type: Option<String>,
    pub predicted_yield: f64,
    pub confidence_range: String,
    pub category: String,
    pub recommendation: String,
    pub created_at: DateTime<Utc>,
}

/// Reject identities that could not have come from a sane client
pub fn validate_identity(identity: &str) -> Result<&str, HistoryError> {
    let trimmed = identity.trim();
    if trimmed.is_empty() {
        return Err(HistoryError::InvalidIdentity(
            "identity must not be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_IDENTITY_LEN {
        return Err(HistoryError::InvalidIdentity(format!(
            "identity longer than {MAX_IDENTITY_LEN} characters"
        )));
    }
    Ok(trimmed)
}

#[derive(Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one prediction. Each call is an independent insert.
    pub async fn record(
        &self,
        identity: &str,
        crop: &CropObservation,
        result: &PredictionResult,
    ) -> Result<PredictionRecord, HistoryError> {
        let identity = validate_identity(identity)?;

        let record = sqlx::query_as::<_, PredictionRecord>(
            r#"
            INSERT INTO predictions (
                id, identity, soil_type, ph, seed_variety, rainfall_mm,
                temperature_c, humidity_percent, planting_date, fertilizer_type,
                predicted_yield, confidence_range, category, recommendation, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING
                id, identity, soil_type, ph, seed_variety, rainfall_mm,
                temperature_c, humidity_percent, planting_date, fertilizer_type,
                predicted_yield, confidence_range, category, recommendation, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(identity)
        .bind(&crop.soil_type)
        .bind(crop.ph)
        .bind(&crop.seed_variety)
        .bind(crop.rainfall_mm)
        .bind(crop.temperature_c)
        .bind(crop.humidity_pct)
        .bind(&crop.planting_date)
        .bind(&crop.fertilizer_type)
        .bind(result.predicted_yield)
        .bind(result.confidence.to_string())
        .bind(result.category.as_str())
        .bind(&result.recommendation)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        info!(identity = %identity, record_id = %record.id, "Stored prediction");
        Ok(record)
    }

    /// All predictions for an identity, newest first
    pub async fn for_identity(&self, identity: &str) -> Result<Vec<PredictionRecord>, HistoryError> {
        let identity = validate_identity(identity)?;

        let records = sqlx::query_as::<_, PredictionRecord>(
            r#"
            SELECT
                id, identity, soil_type, ph, seed_variety, rainfall_mm,
                temperature_c, humidity_percent, planting_date, fertilizer_type,
                predicted_yield, confidence_range, category, recommendation, created_at
            FROM predictions
            WHERE identity = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(identity)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
