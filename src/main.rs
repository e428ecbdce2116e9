use std::sync::Arc;
use anyhow::Context;

use service_desk::{api, bootstrap, config::Config, db, logging, notify};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create {}", config.data_dir.display()))?;

    let _log_guard = logging::init_logging(&config.data_dir)?;

    tracing::info!("Service desk starting up...");
    tracing::info!("Data directory: {:?}", config.data_dir);

    let database = Arc::new(db::Database::open(config.db_path()).context("failed to open database")?);

    bootstrap::ensure_admin(&database, config.admin_token.clone(), &config.admin_token_path())?;

    let notifier = Arc::new(notify::start_notification_worker(database.clone()));

    let handle = api::start_server(database, notifier, config.api_config())
        .await
        .map_err(|e| anyhow::anyhow!("failed to start API server: {}", e))?;

    tracing::info!("API server started on {}", handle.addr);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    handle.shutdown();

    Ok(())
}
