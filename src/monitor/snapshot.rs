use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::feed::QuakeEvent;

/// Whether the current snapshot came from the feed or from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    Fresh,
    Degraded,
}

impl FeedStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Degraded => "degraded",
        }
    }
}

impl fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical event list broadcast to consumers.
///
/// Events are ordered by `time` descending (ties by id) and ids are unique.
/// A snapshot is built once and never mutated; refreshes replace it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    events: Vec<QuakeEvent>,
    pub fetched_at: DateTime<Utc>,
    pub degraded: bool,
}

impl Snapshot {
    pub fn new(mut events: Vec<QuakeEvent>, fetched_at: DateTime<Utc>, degraded: bool) -> Self {
        events.sort_by(|a, b| b.time.cmp(&a.time).then_with(|| a.id.cmp(&b.id)));
        let mut seen = HashSet::with_capacity(events.len());
        events.retain(|event| seen.insert(event.id.clone()));
        Self {
            events,
            fetched_at,
            degraded,
        }
    }

    /// Placeholder held before the first successful refresh.
    pub fn empty() -> Self {
        Self {
            events: Vec::new(),
            fetched_at: DateTime::<Utc>::default(),
            degraded: true,
        }
    }

    pub fn events(&self) -> &[QuakeEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn status(&self) -> FeedStatus {
        if self.degraded {
            FeedStatus::Degraded
        } else {
            FeedStatus::Fresh
        }
    }
}
