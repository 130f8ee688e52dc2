use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use nyusu::config::{Config, DATABASE_PATH_ENV};
use nyusu::feed::{Fetcher, Ingestor, Scheduler, TickOutcome};
use nyusu::storage::{Database, StorageError};

#[derive(Parser, Debug)]
#[command(name = "nyusu", version, about = "Periodic RSS/Atom feed ingestion into SQLite")]
struct Args {
    /// Config file (missing file means defaults)
    #[arg(long, value_name = "FILE", default_value = "nyusu.toml")]
    config: PathBuf,

    /// Database file, overrides config and NYUSU_DATABASE_PATH
    #[arg(long, value_name = "FILE")]
    database: Option<String>,

    /// Subscribe to a feed URL before scheduling (repeatable)
    #[arg(long, value_name = "URL")]
    subscribe: Vec<String>,

    /// Run a single fetch batch and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?
        .with_database_override(std::env::var(DATABASE_PATH_ENV).ok(), args.database);
    config.validate().context("Invalid configuration")?;

    let db = match Database::open(&config.database_path).await {
        Ok(db) => Arc::new(db),
        Err(StorageError::InstanceLocked) => {
            eprintln!(
                "Error: Database '{}' is locked by another nyusu instance. Stop it and try again.",
                config.database_path
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let fetcher = Fetcher::new(&config.fetch_config()).context("Failed to build HTTP client")?;
    let ingestor = Arc::new(Ingestor::new(Arc::clone(&db), fetcher));

    for url in &args.subscribe {
        match ingestor.subscribe(url).await {
            Ok(sub) => println!(
                "Subscribed to {} (feed {}, {} new posts)",
                url, sub.feed_id, sub.ingest.items_written
            ),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Subscription failed");
                eprintln!("Failed to subscribe to {}: {}", url, e);
            }
        }
    }

    let scheduler = Scheduler::new(
        Arc::clone(&ingestor),
        config.tick_interval(),
        config.batch_size,
    );

    if args.once {
        if let TickOutcome::Completed(report) = scheduler.tick().await {
            println!(
                "Fetched {} feeds: {} new posts, {} failed",
                report.results.len() + report.panicked,
                report.items_written(),
                report.failed_feeds()
            );
        }
        return Ok(());
    }

    tokio::select! {
        _ = scheduler.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            tracing::info!("Shutdown requested, stopping scheduler");
        }
    }

    Ok(())
}
