//! Traits for event sources.

use async_trait::async_trait;

use crate::feed::error::FetchFailure;
use crate::feed::types::{FeedWindow, QuakeEvent};

/// Source of earthquake events for one feed window.
///
/// Implemented by the retrying `Fetcher`; tests substitute scripted
/// sources. Implementations never consult the local cache.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch(&self, window: FeedWindow) -> Result<Vec<QuakeEvent>, FetchFailure>;
}
