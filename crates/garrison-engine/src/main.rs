//! Server binary for the Garrison strategy core.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `garrison-config.yaml` (or `GARRISON_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the state store: `PostgreSQL` when a database URL is configured,
//!    otherwise in memory
//! 4. Seed AI countries if none exist
//! 5. Start the agent scheduler
//! 6. Wait for Ctrl-C, then stop the scheduler after its current cycle

mod error;
mod seeding;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use garrison_core::config::{LogFormat, LoggingConfig};
use garrison_core::{AgentScheduler, GameConfig, GameService, StrategyRegistry};
use garrison_db::{InMemoryStore, PgStateStore, StateStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "garrison-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any startup step fails or the scheduler task dies.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    let (config, config_path) = load_config()?;
    init_tracing(&config.logging);

    info!("garrison-engine starting");
    match &config_path {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }
    info!(
        min_interval_secs = config.scheduler.min_interval_secs,
        max_interval_secs = config.scheduler.max_interval_secs,
        store_timeout_ms = config.infrastructure.store_timeout_ms,
        initial_money = config.economy.initial_money,
        max_loan = config.economy.max_loan,
        "Game settings"
    );

    if let Some(url) = config.infrastructure.database_url.clone() {
        let store =
            Arc::new(PgStateStore::connect(&url, config.infrastructure.max_connections).await?);
        let result = serve(Arc::clone(&store), &config).await;
        store.close().await;
        result
    } else {
        warn!("No database URL configured, state is kept in memory and lost on exit");
        serve(Arc::new(InMemoryStore::new()), &config).await
    }
}

/// Seed the world, run the scheduler, and block until shutdown.
async fn serve<S: StateStore>(store: Arc<S>, config: &GameConfig) -> Result<(), EngineError> {
    let service = Arc::new(GameService::new(store, config));
    seeding::seed_ai_countries(&service, &config.world, Utc::now()).await?;

    let mut scheduler =
        AgentScheduler::new(Arc::clone(&service), StrategyRegistry::default(), &config.scheduler);
    scheduler.start()?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, waiting for the current cycle");
    scheduler.stop().await?;

    info!("garrison-engine shutdown complete");
    Ok(())
}

/// Load and validate configuration.
///
/// Reads `GARRISON_CONFIG` if set, else `garrison-config.yaml`. A missing
/// file yields defaults (still subject to `DATABASE_URL`). Returns the path
/// actually read, if any.
fn load_config() -> Result<(GameConfig, Option<PathBuf>), EngineError> {
    let path = std::env::var_os("GARRISON_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, source) = if path.exists() {
        (GameConfig::from_file(&path)?, Some(path))
    } else {
        (GameConfig::parse("")?, None)
    };
    config.validate()?;
    Ok((config, source))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}
