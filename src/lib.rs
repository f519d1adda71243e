//! Quakewatch backend library.
//!
//! Keeps a near-real-time earthquake snapshot fresh and available:
//! - Fetches the public GeoJSON summary feed with bounded retry
//! - Filters events to the configured region
//! - Caches the last known good events in SQLite for offline use
//! - Fans each snapshot out to consumers and sends one alert per
//!   significant event
//!
//! # Architecture
//!
//! - `feed`: HTTP client, GeoJSON decoding, retrying fetcher
//! - `geo`: Bounding regions and distance helpers
//! - `db`: SQLite connection, migrations, queries
//! - `cache`: Cache store trait and its SQLite implementation
//! - `monitor`: Snapshot broadcaster, consumers, notification ledger, timers
//! - `bus`: Event bus for downstream listeners
//! - `stats`: Snapshot statistics and chart series
//! - `config`: Persisted configuration with environment overrides

pub mod bus;
pub mod cache;
pub mod config;
pub mod db;
pub mod feed;
pub mod geo;
pub mod monitor;
pub mod stats;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use bus::{EventBatcher, EventBus, JsonLinesSink};
use cache::SqliteCacheStore;
use config::MonitorConfig;
use db::Database;
use feed::{FeedClient, Fetcher};
use monitor::{BusNotifier, BusSnapshotConsumer, MonitorTasks, SnapshotBroadcaster, StatsConsumer};

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Db(#[from] db::DbError),
    #[error("{0}")]
    Storage(#[from] cache::StorageError),
    #[error("{0}")]
    Config(#[from] config::ConfigError),
    #[error("{0}")]
    Feed(#[from] feed::FeedError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wire a broadcaster from configuration: retrying feed fetcher, SQLite
/// cache, bus-backed notifier, and the built-in bus and stats consumers.
pub fn build_broadcaster(
    config: &MonitorConfig,
    db: Arc<Database>,
    bus: Arc<EventBus>,
) -> Result<Arc<SnapshotBroadcaster>, AppError> {
    let client = FeedClient::new(Some(config.feed_base_url.clone()), config.timeout_ms)?;
    let fetcher = Fetcher::new(client, config.retry_policy());

    let broadcaster = Arc::new(SnapshotBroadcaster::new(
        Arc::new(fetcher),
        Arc::new(SqliteCacheStore::new(db)),
        Arc::new(BusNotifier::new(bus.clone())),
        bus.clone(),
        config.broadcaster_settings(),
    ));
    broadcaster.register(Arc::new(BusSnapshotConsumer::new(
        bus,
        config.notify_threshold,
    )));
    broadcaster.register(Arc::new(StatsConsumer::new(config.notify_threshold)));
    Ok(broadcaster)
}

// ---------------------------------------------------------------------------
// Application entry point
// ---------------------------------------------------------------------------

pub async fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quakewatch=debug,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let db_path = config::db_path()?;
    let db = Arc::new(Database::open(&db_path)?);
    let config = config::load_monitor_config(&db)?;
    tracing::info!(
        "monitoring window={} region={} threshold={} (cache at {})",
        config.window,
        config.region,
        config.notify_threshold,
        db_path.display()
    );

    let bus = Arc::new(EventBus::new());
    let batcher = EventBatcher::start(bus.subscribe(), JsonLinesSink::new(std::io::stdout()));
    let broadcaster = build_broadcaster(&config, db, bus)?;

    let tasks = MonitorTasks::start(
        broadcaster,
        config.refresh_interval(),
        config.eviction_interval(),
    );
    tracing::info!("Quakewatch started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    tasks.shutdown();
    batcher.abort();
    Ok(())
}
