//! Persistent last-known-good event cache.
//!
//! The cache is keyed by event id and is the offline source of truth the
//! broadcaster falls back to when the feed is unreachable. Storage errors
//! are returned to the caller; deciding to treat them as "cache empty" is
//! the broadcaster's job.

mod sqlite;

use async_trait::async_trait;

use crate::db::DbError;
use crate::feed::QuakeEvent;

pub use sqlite::SqliteCacheStore;

pub const MS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("cache storage error: {0}")]
    Db(#[from] DbError),
    #[error("cache task failed: {0}")]
    Task(String),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Upsert events; last write wins per id. Returns the number written.
    async fn put_all(&self, events: &[QuakeEvent]) -> Result<usize, StorageError>;

    /// Every stored event, in no particular order.
    async fn get_all(&self) -> Result<Vec<QuakeEvent>, StorageError>;

    /// Events with `start <= time <= end`.
    async fn get_by_time_range(&self, start: i64, end: i64)
        -> Result<Vec<QuakeEvent>, StorageError>;

    /// Delete events with `time` strictly before `cutoff_ms`.
    async fn evict_before(&self, cutoff_ms: i64) -> Result<usize, StorageError>;

    /// Delete events older than `days` days before now.
    async fn evict_older_than(&self, days: u32) -> Result<usize, StorageError> {
        let cutoff = retention_cutoff(chrono::Utc::now().timestamp_millis(), days);
        self.evict_before(cutoff).await
    }
}

/// Epoch-ms cutoff for a retention window of `days` ending at `now_ms`.
pub fn retention_cutoff(now_ms: i64, days: u32) -> i64 {
    now_ms.saturating_sub(i64::from(days).saturating_mul(MS_PER_DAY))
}
