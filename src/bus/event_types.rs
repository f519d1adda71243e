//! Event type and category constants and flush policy.
//!
//! Single source of truth for which events are "immediate" (handed to the
//! sink without batching) vs batched.

use super::event_bus::BusEvent;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub const CATEGORY_FEED: &str = "feed";
pub const CATEGORY_ALERT: &str = "alert";

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

pub const EVENT_FEED_STATUS: &str = "feed.status";
pub const EVENT_SNAPSHOT_UPDATED: &str = "snapshot.updated";
pub const EVENT_ALERT_THRESHOLD: &str = "alert.threshold";
pub const EVENT_CACHE_EVICTED: &str = "cache.evicted";

/// Category prefix of an event type (`alert.threshold` → `alert`).
pub fn category_of(event_type: &str) -> &str {
    event_type.split('.').next().unwrap_or(event_type)
}

// ---------------------------------------------------------------------------
// Flush policy
// ---------------------------------------------------------------------------

/// Returns true if this event should be sent to the sink immediately
/// instead of being buffered. Immediate events preserve ordering with the
/// current buffer before being sent.
pub fn should_flush_immediately(event: &BusEvent) -> bool {
    event.category == CATEGORY_FEED || event.category == CATEGORY_ALERT
}
