use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use serde_json::json;

use crate::bus::event_types::{EVENT_CACHE_EVICTED, EVENT_FEED_STATUS};
use crate::bus::EventBus;
use crate::cache::{retention_cutoff, CacheStore, StorageError};
use crate::feed::{EventSource, FeedWindow, QuakeEvent};
use crate::geo::{filter_events, Bounds};

use super::consumers::{ConsumerRegistry, SnapshotConsumer};
use super::ledger::NotificationLedger;
use super::notifier::{Notifier, QuakeAlert};
use super::snapshot::{FeedStatus, Snapshot};

pub const DEFAULT_NOTIFY_THRESHOLD: f64 = 4.0;
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BroadcasterSettings {
    pub window: FeedWindow,
    pub bounds: Bounds,
    pub notify_threshold: f64,
    pub retention_days: u32,
}

impl Default for BroadcasterSettings {
    fn default() -> Self {
        Self {
            window: FeedWindow::Week,
            bounds: Bounds::WORLD,
            notify_threshold: DEFAULT_NOTIFY_THRESHOLD,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

/// How a refresh cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshSource {
    /// Fetch succeeded; snapshot replaced with fresh events.
    Feed,
    /// Fetch failed; snapshot replaced with cached events.
    Cache,
    /// Fetch failed and the cache was empty; previous snapshot kept.
    Retained,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub source: RefreshSource,
    pub status: FeedStatus,
    #[serde(skip)]
    pub snapshot: Arc<Snapshot>,
    pub notified: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvictionReport {
    pub cutoff_ms: i64,
    pub evicted_events: usize,
    pub pruned_ledger_entries: usize,
}

struct BroadcasterState {
    snapshot: Arc<Snapshot>,
    status: FeedStatus,
}

type InflightRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Owns the canonical snapshot and drives the refresh cycle.
///
/// Concurrent `refresh` calls share the in-flight cycle: only one fetch
/// and one cache write happen per cycle.
pub struct SnapshotBroadcaster {
    source: Arc<dyn EventSource>,
    cache: Arc<dyn CacheStore>,
    notifier: Arc<dyn Notifier>,
    bus: Arc<EventBus>,
    consumers: ConsumerRegistry,
    ledger: NotificationLedger,
    settings: RwLock<BroadcasterSettings>,
    state: RwLock<BroadcasterState>,
    inflight: Mutex<Option<InflightRefresh>>,
}

impl SnapshotBroadcaster {
    pub fn new(
        source: Arc<dyn EventSource>,
        cache: Arc<dyn CacheStore>,
        notifier: Arc<dyn Notifier>,
        bus: Arc<EventBus>,
        settings: BroadcasterSettings,
    ) -> Self {
        Self {
            source,
            cache,
            notifier,
            bus,
            consumers: ConsumerRegistry::new(),
            ledger: NotificationLedger::new(),
            settings: RwLock::new(settings),
            state: RwLock::new(BroadcasterState {
                snapshot: Arc::new(Snapshot::empty()),
                status: FeedStatus::Degraded,
            }),
            inflight: Mutex::new(None),
        }
    }

    pub fn register(&self, consumer: Arc<dyn SnapshotConsumer>) {
        self.consumers.register(consumer);
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.read_state(|state| state.snapshot.clone())
    }

    pub fn status(&self) -> FeedStatus {
        self.read_state(|state| state.status)
    }

    pub fn settings(&self) -> BroadcasterSettings {
        match self.settings.read() {
            Ok(settings) => *settings,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn ledger(&self) -> &NotificationLedger {
        &self.ledger
    }

    /// Replace the active region filter. Cache contents are untouched; the
    /// new bounds apply from the next refresh on.
    pub fn set_bounds(&self, bounds: Bounds) {
        let mut settings = self
            .settings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        settings.bounds = bounds;
        tracing::info!(
            "active bounds set to lat [{}, {}] lng [{}, {}]",
            bounds.min_lat,
            bounds.max_lat,
            bounds.min_lng,
            bounds.max_lng
        );
    }

    /// Run one refresh cycle, or join the one already in flight.
    pub async fn refresh(self: &Arc<Self>) -> RefreshOutcome {
        let cycle = {
            let mut inflight = self
                .inflight
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match inflight.as_ref() {
                Some(cycle) => {
                    tracing::debug!("refresh already in flight, joining it");
                    cycle.clone()
                }
                None => {
                    let this = Arc::clone(self);
                    let cycle = async move {
                        let outcome = this.run_cycle().await;
                        this.clear_inflight();
                        outcome
                    }
                    .boxed()
                    .shared();
                    *inflight = Some(cycle.clone());
                    cycle
                }
            }
        };
        cycle.await
    }

    /// Evict cache entries and ledger ids past the retention window.
    pub async fn evict_expired(&self) -> Result<EvictionReport, StorageError> {
        let retention_days = self.settings().retention_days;
        let cutoff_ms = retention_cutoff(Utc::now().timestamp_millis(), retention_days);

        // The ledger is pruned even when the cache sweep fails.
        let evicted = self.cache.evict_before(cutoff_ms).await;
        let pruned_ledger_entries = self.ledger.prune_before(cutoff_ms);
        let evicted_events = match evicted {
            Ok(count) => count,
            Err(error) => {
                tracing::warn!(
                    "cache eviction failed, pruned {} ledger ids: {}",
                    pruned_ledger_entries,
                    error
                );
                return Err(error);
            }
        };

        let report = EvictionReport {
            cutoff_ms,
            evicted_events,
            pruned_ledger_entries,
        };
        if evicted_events > 0 || pruned_ledger_entries > 0 {
            tracing::info!(
                "retention sweep: {} cached events, {} ledger ids older than {} days removed",
                evicted_events,
                pruned_ledger_entries,
                retention_days
            );
        }
        self.bus.emit(
            EVENT_CACHE_EVICTED,
            serde_json::to_value(report).unwrap_or_default(),
        );
        Ok(report)
    }

    async fn run_cycle(&self) -> RefreshOutcome {
        let settings = self.settings();

        let outcome = match self.source.fetch(settings.window).await {
            Ok(events) => {
                let events = filter_events(events, &settings.bounds);
                if let Err(error) = self.cache.put_all(&events).await {
                    tracing::warn!("cache write-through failed, continuing with fresh data: {error}");
                }
                let snapshot = Arc::new(Snapshot::new(events, Utc::now(), false));
                self.replace(snapshot.clone(), FeedStatus::Fresh);
                tracing::info!(
                    "refresh ok: {} events in window={} (fresh)",
                    snapshot.len(),
                    settings.window
                );
                let notified = self.publish(&snapshot, &settings);
                RefreshOutcome {
                    source: RefreshSource::Feed,
                    status: FeedStatus::Fresh,
                    snapshot,
                    notified,
                    error: None,
                }
            }
            Err(failure) => {
                tracing::warn!("feed unavailable, falling back to cache: {failure}");
                let cached = match self.cache.get_all().await {
                    Ok(events) => filter_events(events, &settings.bounds),
                    Err(error) => {
                        tracing::warn!("cache unavailable, treating as empty: {error}");
                        Vec::new()
                    }
                };

                if cached.is_empty() {
                    let snapshot = self.read_state(|state| state.snapshot.clone());
                    self.replace(snapshot.clone(), FeedStatus::Degraded);
                    tracing::warn!(
                        "cache empty, keeping previous snapshot of {} events (degraded)",
                        snapshot.len()
                    );
                    RefreshOutcome {
                        source: RefreshSource::Retained,
                        status: FeedStatus::Degraded,
                        snapshot,
                        notified: 0,
                        error: Some(failure.to_string()),
                    }
                } else {
                    let snapshot = Arc::new(Snapshot::new(cached, Utc::now(), true));
                    self.replace(snapshot.clone(), FeedStatus::Degraded);
                    tracing::warn!("serving {} cached events (degraded)", snapshot.len());
                    let notified = self.publish(&snapshot, &settings);
                    RefreshOutcome {
                        source: RefreshSource::Cache,
                        status: FeedStatus::Degraded,
                        snapshot,
                        notified,
                        error: Some(failure.to_string()),
                    }
                }
            }
        };

        self.bus.emit(
            EVENT_FEED_STATUS,
            json!({
                "status": outcome.status,
                "source": outcome.source,
                "degraded": outcome.status == FeedStatus::Degraded,
                "event_count": outcome.snapshot.len(),
                "fetched_at": outcome.snapshot.fetched_at.to_rfc3339(),
                "error": outcome.error,
            }),
        );
        outcome
    }

    /// Hand the snapshot to consumers, then apply the notification policy.
    fn publish(&self, snapshot: &Snapshot, settings: &BroadcasterSettings) -> usize {
        self.consumers.dispatch(snapshot);
        self.notify_new_significant(snapshot.events(), settings.notify_threshold, snapshot.degraded)
    }

    fn notify_new_significant(&self, events: &[QuakeEvent], threshold: f64, from_cache: bool) -> usize {
        let mut notified = 0;
        for event in events.iter().filter(|event| event.magnitude >= threshold) {
            if !self.ledger.record(&event.id, event.time) {
                continue;
            }
            let alert = QuakeAlert::new(event, threshold, from_cache);
            match self.notifier.notify(&alert) {
                Ok(()) => notified += 1,
                Err(error) => tracing::warn!("alert for {} not delivered: {error}", event.id),
            }
        }
        notified
    }

    fn replace(&self, snapshot: Arc<Snapshot>, status: FeedStatus) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.snapshot = snapshot;
        state.status = status;
    }

    fn read_state<T>(&self, read: impl FnOnce(&BroadcasterState) -> T) -> T {
        match self.state.read() {
            Ok(state) => read(&state),
            Err(poisoned) => read(&poisoned.into_inner()),
        }
    }

    fn clear_inflight(&self) {
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *inflight = None;
    }
}
