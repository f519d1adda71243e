//! Snapshot broadcaster: the refresh, fallback and fan-out core.
//!
//! The broadcaster is the central component of the monitor:
//! - Fetches the configured feed window and applies the region filter
//! - Writes fresh events through to the cache
//! - Falls back to cached events (degraded) when the feed is down
//! - Hands each new snapshot to registered consumers
//! - Sends one threshold alert per event id
//!
//! # Sub-modules
//!
//! - `snapshot`: Snapshot and feed status types
//! - `ledger`: Retention-bounded notification ledger
//! - `consumers`: Consumer trait, registry, built-in consumers
//! - `notifier`: Alert type and notifier trait
//! - `scheduler`: Refresh and retention timers

mod broadcaster;
mod consumers;
mod ledger;
mod notifier;
mod scheduler;
mod snapshot;

pub use broadcaster::{
    BroadcasterSettings, EvictionReport, RefreshOutcome, RefreshSource, SnapshotBroadcaster,
    DEFAULT_NOTIFY_THRESHOLD, DEFAULT_RETENTION_DAYS,
};
pub use consumers::{
    BusSnapshotConsumer, ConsumerError, ConsumerRegistry, DispatchReport, FnConsumer,
    SnapshotConsumer, StatsConsumer,
};
pub use ledger::NotificationLedger;
pub use notifier::{BusNotifier, Notifier, NotifyError, QuakeAlert};
pub use scheduler::{spawn_eviction_loop, spawn_refresh_loop, MonitorTasks};
pub use snapshot::{FeedStatus, Snapshot};
