use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::history::HistoryStore;
use crate::ml::{RawObservation, YieldService};
use crate::server::{self, State};

fn load_service(config: &Config) -> Result<YieldService> {
    YieldService::from_model_path(&config.model.path)
        .with_context(|| format!("Failed to load model from {}", config.model.path.display()))
}

/// Start the HTTP server with the configured model and optional history
pub async fn serve(config: Config) -> Result<()> {
    let state = State::new(config).await?;
    server::start_server(state).await
}

/// Parse the observation from an inline JSON string or a file
pub fn read_observation(input: Option<String>, file: Option<PathBuf>) -> Result<RawObservation> {
    let text = match (input, file) {
        (Some(input), None) => input,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => bail!("Provide an observation with --input or --file"),
        (Some(_), Some(_)) => bail!("--input and --file are mutually exclusive"),
    };

    let value: Value = serde_json::from_str(&text).context("Observation is not valid JSON")?;
    Ok(RawObservation::from_json(&value)?)
}

/// Run one prediction and print it as pretty JSON
pub fn predict(config: Config, input: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let raw = read_observation(input, file)?;
    let service = load_service(&config)?;

    let prediction = service.predict(&raw)?;
    for warning in &prediction.warnings {
        warn!("{}", warning);
    }

    let output = serde_json::json!({
        "predicted_yield": prediction.result.predicted_yield,
        "confidence_range": prediction.result.confidence.to_string(),
        "category": prediction.result.category,
        "recommendation": prediction.result.recommendation,
        "input_summary": raw,
        "warnings": prediction.warnings,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// Print the model's feature order, one column per line
pub fn schema(config: Config) -> Result<()> {
    let service = load_service(&config)?;
    let schema = service.schema();

    println!("{} features:", schema.len());
    for (idx, column) in schema.columns().iter().enumerate() {
        println!("  {idx:>3}  {column}");
    }

    if !schema.categories().is_empty() {
        println!("\nCategorical attributes:");
        for (attribute, values) in schema.categories() {
            println!("  {attribute}: {}", values.join(", "));
        }
    }

    Ok(())
}

/// Print stored predictions for one identity
pub async fn history(config: Config, username: String) -> Result<()> {
    let db_config = config
        .database
        .context("DATABASE_URL must be set to read prediction history")?;

    let db = Database::new(&db_config).await?;
    db.run_migrations().await?;
    let store = HistoryStore::new(db.pool.clone());

    let records = store.for_identity(&username).await?;
    info!(count = records.len(), "Loaded prediction history");

    if records.is_empty() {
        println!("No predictions stored for {username}");
    }
    for record in &records {
        println!(
            "{}  {:>7.2}  {:<14}  {}",
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            record.predicted_yield,
            record.category,
            record.confidence_range
        );
    }

    db.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_observation_inline() {
        let raw = read_observation(Some(r#"{"pH": 6.1, "Soil_Type": "Clay"}"#.to_string()), None)
            .unwrap();
        assert_eq!(raw.number("pH"), Some(6.1));
    }

    #[test]
    fn test_read_observation_requires_source() {
        assert!(read_observation(None, None).is_err());
    }

    #[test]
    fn test_read_observation_rejects_invalid_json() {
        let err = read_observation(Some("{pH: 6".to_string()), None).unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_read_observation_rejects_nested() {
        assert!(read_observation(Some(r#"{"pH": [6.1]}"#.to_string()), None).is_err());
    }
}
