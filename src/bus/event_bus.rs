use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::event_types::category_of;

const BUS_CAPACITY: usize = 256;

/// One monitor event as it leaves the broadcaster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusEvent {
    pub seq: u64,
    pub category: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub emitted_at: DateTime<Utc>,
}

/// Fan-out of feed status, snapshot, alert and cache events.
pub struct EventBus {
    tx: broadcast::Sender<BusEvent>,
    seq: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(BUS_CAPACITY)
    }

    /// Slow subscribers lag (and skip) once `capacity` events are queued.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            seq: AtomicU64::new(0),
        }
    }

    /// Stamp and publish an event. The category is the `event_type` prefix
    /// before the first dot (`feed.status` → `feed`).
    pub fn emit(&self, event_type: &str, payload: serde_json::Value) -> BusEvent {
        let event = BusEvent {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            category: category_of(event_type).to_string(),
            event_type: event_type.to_string(),
            payload,
            emitted_at: Utc::now(),
        };
        if self.tx.send(event.clone()).is_err() {
            tracing::trace!("no subscribers for {}", event.event_type);
        }
        event
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
