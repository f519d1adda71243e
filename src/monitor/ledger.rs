use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Ids of events that already produced a threshold notification.
///
/// Each id is remembered with its event time so the ledger can be pruned
/// on the same retention horizon as the cache.
#[derive(Debug, Default)]
pub struct NotificationLedger {
    notified: DashMap<String, i64>,
}

impl NotificationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id`. Returns true if it was not already present.
    pub fn record(&self, id: &str, event_time: i64) -> bool {
        match self.notified.entry(id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(event_time);
                true
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.notified.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.notified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notified.is_empty()
    }

    /// Forget ids whose event time is strictly before `cutoff_ms`.
    pub fn prune_before(&self, cutoff_ms: i64) -> usize {
        let before = self.notified.len();
        self.notified.retain(|_, event_time| *event_time >= cutoff_ms);
        before - self.notified.len()
    }
}
