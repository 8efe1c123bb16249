//! CronDaemon - durable cron task daemon
//!
//! Boot sequence: flags, logging, config, store, seeding, coordinator,
//! then park until a shutdown signal. Administration happens through the
//! coordinator's in-process API, not through this binary.

use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use crondaemon::cli::Cli;
use crondaemon::config::Config;
use crondaemon::coordinator::Coordinator;
use crondaemon::seed::seed_example_tasks;
use cronstore::SqliteTaskStore;

fn setup_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    // Load configuration, then apply CLI overrides
    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(db) = cli.db {
        config.storage.db_path = db;
    }
    if let Some(timezone) = cli.timezone {
        config.schedule.timezone = timezone;
    }

    info!(
        db_path = %config.storage.db_path.display(),
        timezone = %config.schedule.timezone,
        "CronDaemon starting"
    );

    let store = Arc::new(
        SqliteTaskStore::open(&config.storage.db_path).context("Failed to open task store")?,
    );

    if config.seed_examples {
        seed_example_tasks(store.as_ref()).context("Failed to seed example tasks")?;
    }

    // An unresolvable timezone is fatal; nothing has been scheduled yet
    let coordinator = Coordinator::new(store, &config.schedule)?;
    coordinator.start_all().await.context("Failed to start tasks")?;

    info!(
        scheduled = coordinator.scheduled_count().await,
        "CronDaemon running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await.context("Failed to wait for shutdown signal")?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
