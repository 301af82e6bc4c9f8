use anyhow::{Context, Result};

use crate::config::Config;
use crate::db::Database;

pub async fn execute(config: Config) -> Result<()> {
    let db_config = config
        .database
        .context("DATABASE_URL must be set to run migrations")?;

    let db = Database::new(&db_config).await?;
    db.run_migrations().await?;
    db.close().await;

    println!("Database migrations completed successfully");
    Ok(())
}
