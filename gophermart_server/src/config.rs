//! Daemon configuration.
//!
//! All settings come from `GM_*` environment variables, read once at startup by
//! [`ServerConfig::from_env_or_default`]. Missing or malformed values fall back to their defaults, with a log
//! message saying so.
use std::{env, time::Duration};

use accrual_tools::AccrualConfig;
use gm_common::{
    helpers::{parse_boolean_flag, parse_positive},
    Secret,
};
use log::*;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_TASK_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_WORKERS: usize = 1;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: Secret<String>,
    pub max_connections: u32,
    /// If true, pending schema migrations are applied before the workers start.
    pub run_migrations: bool,
    /// The time between reconciliation ticks, per worker.
    pub task_interval: Duration,
    /// The number of reconciliation workers to run in this process.
    pub workers: usize,
    pub accrual: AccrualConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: Secret::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            run_migrations: true,
            task_interval: DEFAULT_TASK_INTERVAL,
            workers: DEFAULT_WORKERS,
            accrual: AccrualConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = env::var("GM_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ GM_DATABASE_URL is not set. Please set it to the URL for the gophermart database.");
            String::default()
        });
        let max_connections = parse_positive(env::var("GM_DB_MAX_CONNECTIONS").ok()).unwrap_or_else(|| {
            info!("🪛️ GM_DB_MAX_CONNECTIONS not set or invalid, using {DEFAULT_MAX_CONNECTIONS} as default");
            DEFAULT_MAX_CONNECTIONS
        });
        let run_migrations = parse_boolean_flag(env::var("GM_RUN_MIGRATIONS").ok(), true);
        let task_interval =
            parse_positive::<u64>(env::var("GM_TASK_INTERVAL").ok()).map(Duration::from_secs).unwrap_or_else(|| {
                info!(
                    "🪛️ GM_TASK_INTERVAL not set or invalid, using {}s as default",
                    DEFAULT_TASK_INTERVAL.as_secs()
                );
                DEFAULT_TASK_INTERVAL
            });
        let workers = parse_positive(env::var("GM_RECONCILIATION_WORKERS").ok()).unwrap_or_else(|| {
            info!("🪛️ GM_RECONCILIATION_WORKERS not set or invalid, using {DEFAULT_WORKERS} as default");
            DEFAULT_WORKERS
        });
        let accrual = AccrualConfig::new_from_env_or_default();
        Self {
            database_url: Secret::new(database_url),
            max_connections,
            run_migrations,
            task_interval,
            workers,
            accrual,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database_url.reveal().is_empty() {
            return Err("GM_DATABASE_URL must be set".to_string());
        }
        Ok(())
    }
}
