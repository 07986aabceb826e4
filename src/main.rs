//! Casewatch CLI entry point.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use casewatch::adapters::http::HttpReviewClient;
use casewatch::adapters::sqlite::{
    all_embedded_migrations, create_pool, Migrator, PoolConfig, SqliteCaseStore,
    SqliteOrderGateway,
};
use casewatch::domain::models::Config;
use casewatch::domain::ports::NoopPaymentEnvironment;
use casewatch::infrastructure::config::ConfigLoader;
use casewatch::services::{DaemonConfig, RetryDaemon, RetryScheduler};

#[derive(Parser)]
#[command(name = "casewatch", about = "Fraud-review case reconciliation job", version)]
struct Cli {
    /// Path to a configuration file (defaults to casewatch.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reconciliation daemon until interrupted
    Run,
    /// Run a single reconciliation tick and exit
    Tick,
    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    init_tracing(&config);

    match cli.command {
        Commands::Run => run_daemon(&config, true).await,
        Commands::Tick => run_daemon(&config, false).await,
        Commands::Migrate => migrate(&config).await,
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn migrate(config: &Config) -> Result<()> {
    let pool = create_pool(
        &config.database.path,
        Some(PoolConfig {
            max_connections: config.database.max_connections,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(config.database.acquire_timeout_secs),
        }),
    )
    .await
    .context("failed to open database")?;

    let applied = Migrator::new(pool)
        .run_embedded_migrations(all_embedded_migrations())
        .await
        .context("failed to run migrations")?;
    tracing::info!(applied, "migrations complete");
    Ok(())
}

async fn run_daemon(config: &Config, forever: bool) -> Result<()> {
    let pool = create_pool(
        &config.database.path,
        Some(PoolConfig {
            max_connections: config.database.max_connections,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(config.database.acquire_timeout_secs),
        }),
    )
    .await
    .context("failed to open database")?;

    Migrator::new(pool.clone())
        .run_embedded_migrations(all_embedded_migrations())
        .await
        .context("failed to run migrations")?;

    let store = SqliteCaseStore::new(pool.clone()).with_lock_settings(
        Duration::from_millis(config.scheduler.lock_timeout_ms),
        Duration::from_secs(config.scheduler.lock_ttl_secs),
    );
    let orders = SqliteOrderGateway::new(pool);
    let review = HttpReviewClient::new(
        &config.review.endpoint,
        &config.review.api_key,
        Duration::from_secs(config.review.timeout_secs),
    )
    .context("failed to build review client")?;

    let scheduler = Arc::new(RetryScheduler::new(
        Arc::new(store),
        Arc::new(review),
        Arc::new(orders),
        Arc::new(NoopPaymentEnvironment),
        config.scheduler.promotion_threshold,
    ));

    let daemon = RetryDaemon::new(
        scheduler,
        DaemonConfig {
            tick_interval: Duration::from_secs(config.scheduler.tick_interval_secs),
            run_on_startup: config.scheduler.run_on_startup,
        },
    );

    if forever {
        let handle = daemon.handle();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested, stopping after current tick");
                handle.stop();
            }
        });
        daemon.run().await;
    } else {
        daemon.run_once().await;
    }

    Ok(())
}
