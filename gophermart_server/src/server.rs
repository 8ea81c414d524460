use accrual_tools::AccrualApi;
use gophermart_engine::{PostgresDatabase, ShutdownSignal};
use log::*;

use crate::{config::ServerConfig, errors::ServerError, reconciliation_worker::start_reconciliation_workers};

/// Runs the daemon until Ctrl-C is received.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    config.validate().map_err(ServerError::ConfigurationError)?;
    let db = PostgresDatabase::new_with_url(config.database_url.reveal(), config.max_connections).await?;
    if config.run_migrations {
        db.run_migrations().await?;
    }
    let oracle = AccrualApi::new(config.accrual.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🚀️ Using the accrual system at {}", config.accrual.base_url);

    let shutdown = ShutdownSignal::new();
    let workers = start_reconciliation_workers(config.workers, db.clone(), oracle, config.task_interval, &shutdown);
    info!("🚀️ {} reconciliation worker(s) running every {}s", workers.len(), config.task_interval.as_secs());

    let signal = tokio::signal::ctrl_c().await;
    match &signal {
        Ok(()) => info!("🚀️ Shutdown requested. Waiting for in-flight ticks to finish."),
        Err(e) => error!("🚀️ Could not listen for the shutdown signal. {e}. Shutting down."),
    }
    shutdown.trigger();
    for worker in workers {
        if let Err(e) = worker.await {
            error!("🚀️ A reconciliation worker did not stop cleanly. {e}");
        }
    }
    db.close().await;
    signal.map_err(ServerError::from)
}
