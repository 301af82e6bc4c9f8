use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;

pub mod commands;
pub mod migrate;

#[derive(Parser)]
#[command(
    name = "maize-yield",
    about = "Maize yield prediction service",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Model artifact path (overrides MODEL_PATH)
    #[arg(short, long, global = true)]
    pub model: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP prediction server
    Serve,

    /// Run a single prediction and print the result as JSON
    Predict {
        /// Observation as an inline JSON object
        #[arg(short, long, conflicts_with = "file")]
        input: Option<String>,

        /// Path to a JSON file holding the observation
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Print the feature order the loaded model expects
    Schema,

    /// Show stored predictions for a user
    History {
        /// Identity the predictions were stored under
        #[arg(short, long)]
        username: String,
    },

    /// Run database migrations
    Migrate,
}

/// Execute CLI command
pub async fn run(cli: Cli, mut config: Config) -> Result<()> {
    if let Some(model) = cli.model {
        config.model.path = model;
    }

    match cli.command {
        Commands::Serve => {
            info!("Starting prediction server");
            commands::serve(config).await?;
        }
        Commands::Predict { input, file } => {
            info!("Running one-off prediction");
            commands::predict(config, input, file)?;
        }
        Commands::Schema => {
            commands::schema(config)?;
        }
        Commands::History { username } => {
            info!("Fetching prediction history for {}", username);
            commands::history(config, username).await?;
        }
        Commands::Migrate => {
            migrate::execute(config).await?;
        }
    }
    Ok(())
}
