use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::{config::Config, db::Database, history::HistoryStore, ml::YieldService};

pub struct State {
    pub config: Config,
    pub service: Arc<YieldService>,
    pub history: Option<HistoryStore>,
}

impl State {
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        let service = YieldService::from_model_path(&config.model.path).with_context(|| {
            format!("Failed to load model from {}", config.model.path.display())
        })?;
        info!(features = service.schema().len(), "Model loaded");

        let history = match &config.database {
            Some(db_config) => {
                let db = Database::new(db_config).await?;
                db.run_migrations().await?;
                db.health_check().await?;
                Some(HistoryStore::new(db.pool))
            }
            None => {
                warn!("DATABASE_URL not set, prediction history disabled");
                None
            }
        };

        Ok(Self::from_parts(config, Arc::new(service), history))
    }

    pub fn from_parts(
        config: Config,
        service: Arc<YieldService>,
        history: Option<HistoryStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            service,
            history,
        })
    }
}
