use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::broadcaster::SnapshotBroadcaster;

/// Background timers driving a broadcaster.
pub struct MonitorTasks {
    refresh: JoinHandle<()>,
    eviction: JoinHandle<()>,
}

impl MonitorTasks {
    /// Spawn the refresh timer (first tick fires immediately) and the
    /// independent retention timer.
    pub fn start(
        broadcaster: Arc<SnapshotBroadcaster>,
        refresh_every: Duration,
        evict_every: Duration,
    ) -> Self {
        Self {
            refresh: spawn_refresh_loop(broadcaster.clone(), refresh_every),
            eviction: spawn_eviction_loop(broadcaster, evict_every),
        }
    }

    pub fn shutdown(self) {
        self.refresh.abort();
        self.eviction.abort();
    }
}

pub fn spawn_refresh_loop(
    broadcaster: Arc<SnapshotBroadcaster>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let outcome = broadcaster.refresh().await;
            tracing::debug!(
                "scheduled refresh finished: source={:?} status={} events={}",
                outcome.source,
                outcome.status,
                outcome.snapshot.len()
            );
        }
    })
}

pub fn spawn_eviction_loop(
    broadcaster: Arc<SnapshotBroadcaster>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Skip the immediate first tick; the cache was just opened.
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(error) = broadcaster.evict_expired().await {
                tracing::warn!("retention sweep failed: {error}");
            }
        }
    })
}
