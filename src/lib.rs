// Maize Yield - crop yield prediction service
// Aligns free-form field observations to a trained forest model's feature
// schema, serves predictions with agronomic advisories, and keeps an optional
// per-user prediction history.

#![deny(clippy::unwrap_used)]

pub mod cli;
pub mod config;
pub mod db;
pub mod history;
pub mod ml;
pub mod server;

// Re-export commonly used items
pub use config::Config;
pub use ml::{PredictionError, RawObservation, YieldService};
