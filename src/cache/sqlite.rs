use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::cache::{CacheStore, StorageError};
use crate::db::queries::{self, QuakeEventRow};
use crate::db::{Database, DbError};
use crate::feed::QuakeEvent;

/// [`CacheStore`] backed by the `quake_events` SQLite table.
///
/// Queries run on the blocking pool so the refresh task never parks a
/// runtime worker on disk I/O.
#[derive(Clone)]
pub struct SqliteCacheStore {
    db: Arc<Database>,
}

impl SqliteCacheStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn with_db<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, DbError> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|error| StorageError::Task(error.to_string()))?
            .map_err(StorageError::from)
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn put_all(&self, events: &[QuakeEvent]) -> Result<usize, StorageError> {
        if events.is_empty() {
            return Ok(0);
        }
        let rows: Vec<QuakeEventRow> = events.iter().map(QuakeEventRow::from).collect();
        let cached_at = Utc::now().to_rfc3339();
        self.with_db(move |db| queries::upsert_quake_events(db, &rows, &cached_at))
            .await
    }

    async fn get_all(&self) -> Result<Vec<QuakeEvent>, StorageError> {
        let rows = self.with_db(queries::list_quake_events).await?;
        Ok(rows.into_iter().map(QuakeEvent::from).collect())
    }

    async fn get_by_time_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<QuakeEvent>, StorageError> {
        let rows = self
            .with_db(move |db| queries::list_quake_events_between(db, start, end))
            .await?;
        Ok(rows.into_iter().map(QuakeEvent::from).collect())
    }

    async fn evict_before(&self, cutoff_ms: i64) -> Result<usize, StorageError> {
        let deleted = self
            .with_db(move |db| queries::delete_quake_events_before(db, cutoff_ms))
            .await?;
        if deleted > 0 {
            tracing::info!("evicted {deleted} cached events older than {cutoff_ms}");
        }
        Ok(deleted)
    }
}

impl From<&QuakeEvent> for QuakeEventRow {
    fn from(event: &QuakeEvent) -> Self {
        Self {
            id: event.id.clone(),
            magnitude: event.magnitude,
            place: event.place.clone(),
            time: event.time,
            latitude: event.latitude,
            longitude: event.longitude,
            depth: event.depth,
            url: event.url.clone(),
            felt: event.felt,
            alert: event.alert.clone(),
            edited_by_admin: event.edited_by_admin,
            original_magnitude: event.original_magnitude,
        }
    }
}

impl From<QuakeEventRow> for QuakeEvent {
    fn from(row: QuakeEventRow) -> Self {
        Self {
            id: row.id,
            magnitude: row.magnitude,
            place: row.place,
            time: row.time,
            latitude: row.latitude,
            longitude: row.longitude,
            depth: row.depth,
            url: row.url,
            felt: row.felt,
            alert: row.alert,
            edited_by_admin: row.edited_by_admin,
            original_magnitude: row.original_magnitude,
        }
    }
}
