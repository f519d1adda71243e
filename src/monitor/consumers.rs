//! Snapshot consumers: registration, isolated dispatch, and the consumers
//! shipped with the crate.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde_json::json;

use crate::bus::event_types::EVENT_SNAPSHOT_UPDATED;
use crate::bus::EventBus;
use crate::monitor::snapshot::Snapshot;
use crate::stats::{magnitude_histogram, SnapshotStats};

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("{0}")]
    Failed(String),
}

/// Anything that renders or reacts to a snapshot (map, list, chart, stats).
pub trait SnapshotConsumer: Send + Sync {
    fn name(&self) -> &str;
    fn on_snapshot(&self, snapshot: &Snapshot) -> Result<(), ConsumerError>;
}

/// Adapts a closure into a [`SnapshotConsumer`].
pub struct FnConsumer<F> {
    name: String,
    callback: F,
}

impl<F> FnConsumer<F>
where
    F: Fn(&Snapshot) -> Result<(), ConsumerError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl<F> SnapshotConsumer for FnConsumer<F>
where
    F: Fn(&Snapshot) -> Result<(), ConsumerError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_snapshot(&self, snapshot: &Snapshot) -> Result<(), ConsumerError> {
        (self.callback)(snapshot)
    }
}

/// Consumers in registration order.
#[derive(Default)]
pub struct ConsumerRegistry {
    consumers: RwLock<Vec<Arc<dyn SnapshotConsumer>>>,
}

/// Result of one dispatch round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: Vec<String>,
}

impl ConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, consumer: Arc<dyn SnapshotConsumer>) {
        let mut consumers = self
            .consumers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        consumers.push(consumer);
    }

    pub fn len(&self) -> usize {
        self.consumers
            .read()
            .map(|consumers| consumers.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every consumer in order. A consumer that errors or panics is
    /// logged and skipped; the rest still run.
    pub fn dispatch(&self, snapshot: &Snapshot) -> DispatchReport {
        let consumers: Vec<Arc<dyn SnapshotConsumer>> = match self.consumers.read() {
            Ok(consumers) => consumers.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        let mut report = DispatchReport::default();
        for consumer in consumers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| consumer.on_snapshot(snapshot)));
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(error)) => {
                    tracing::warn!("snapshot consumer '{}' failed: {error}", consumer.name());
                    report.failed.push(consumer.name().to_string());
                }
                Err(_) => {
                    tracing::error!("snapshot consumer '{}' panicked", consumer.name());
                    report.failed.push(consumer.name().to_string());
                }
            }
        }
        report
    }
}

// ---------------------------------------------------------------------------
// Built-in consumers
// ---------------------------------------------------------------------------

/// Publishes every snapshot on the bus as `snapshot.updated`.
pub struct BusSnapshotConsumer {
    bus: Arc<EventBus>,
    threshold: f64,
}

impl BusSnapshotConsumer {
    pub fn new(bus: Arc<EventBus>, threshold: f64) -> Self {
        Self { bus, threshold }
    }
}

impl SnapshotConsumer for BusSnapshotConsumer {
    fn name(&self) -> &str {
        "bus"
    }

    fn on_snapshot(&self, snapshot: &Snapshot) -> Result<(), ConsumerError> {
        let stats = SnapshotStats::compute(snapshot, self.threshold, Utc::now().timestamp_millis());
        let payload = json!({
            "fetched_at": snapshot.fetched_at.to_rfc3339(),
            "degraded": snapshot.degraded,
            "stats": stats,
            "histogram": magnitude_histogram(snapshot.events()),
            "events": snapshot.events(),
        });
        self.bus.emit(EVENT_SNAPSHOT_UPDATED, payload);
        Ok(())
    }
}

/// Keeps the stats of the latest snapshot for the stat counters.
pub struct StatsConsumer {
    threshold: f64,
    latest: RwLock<Option<SnapshotStats>>,
}

impl StatsConsumer {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            latest: RwLock::new(None),
        }
    }

    pub fn latest(&self) -> Option<SnapshotStats> {
        self.latest.read().ok().and_then(|latest| latest.clone())
    }
}

impl SnapshotConsumer for StatsConsumer {
    fn name(&self) -> &str {
        "stats"
    }

    fn on_snapshot(&self, snapshot: &Snapshot) -> Result<(), ConsumerError> {
        let stats = SnapshotStats::compute(snapshot, self.threshold, Utc::now().timestamp_millis());
        tracing::debug!(
            "stats: total={} significant={} last_day={} degraded={}",
            stats.total,
            stats.significant,
            stats.last_day,
            stats.degraded
        );
        let mut latest = self
            .latest
            .write()
            .map_err(|_| ConsumerError::Failed("stats lock poisoned".to_string()))?;
        *latest = Some(stats);
        Ok(())
    }
}
