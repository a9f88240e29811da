//! Remove phrase groups, phrases and message entities no dictionary reaches

use anyhow::Result;
use dictrainer::config::DatabaseConfig;
use dictrainer::{db, maintenance};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = DatabaseConfig::from_env()?;
    config.validate()?;

    let pool = db::connect(&config).await?;
    db::init_database_schema(&pool).await?;

    let report = maintenance::clean(&pool).await?;
    println!("{}", report);

    pool.close().await;
    Ok(())
}
