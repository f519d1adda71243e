//! Test doubles shared by unit tests.
//!
//! Provides a scripted event source, an in-memory cache store, and a
//! recording notifier so the broadcaster can be exercised without a
//! network or a database.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{CacheStore, StorageError};
use crate::db::DbError;
use crate::feed::{EventSource, FeedError, FeedWindow, FetchFailure, QuakeEvent};
use crate::monitor::{Notifier, NotifyError, QuakeAlert};

/// Build an event with the fields tests care about.
pub fn quake(id: &str, magnitude: f64, time: i64, latitude: f64, longitude: f64) -> QuakeEvent {
    QuakeEvent {
        id: id.to_string(),
        magnitude,
        place: format!("near {id}"),
        time,
        latitude,
        longitude,
        depth: 10.0,
        url: format!("https://example.test/{id}"),
        felt: None,
        alert: None,
        edited_by_admin: false,
        original_magnitude: None,
    }
}

pub fn fetch_failure(message: &str) -> FetchFailure {
    FetchFailure {
        attempts: 3,
        last: FeedError::Network(message.to_string()),
    }
}

/// Event source that replays queued results, then fails.
#[derive(Default)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<QuakeEvent>, FetchFailure>>>,
    calls: AtomicUsize,
    windows: Mutex<Vec<FeedWindow>>,
    delay: Option<Duration>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push_ok(&self, events: Vec<QuakeEvent>) {
        self.script.lock().unwrap().push_back(Ok(events));
    }

    pub fn push_err(&self, message: &str) {
        self.script.lock().unwrap().push_back(Err(fetch_failure(message)));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn windows(&self) -> Vec<FeedWindow> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn fetch(&self, window: FeedWindow) -> Result<Vec<QuakeEvent>, FetchFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.windows.lock().unwrap().push(window);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(fetch_failure("script exhausted")))
    }
}

/// In-memory cache keyed by event id.
#[derive(Default)]
pub struct MemoryCacheStore {
    events: Mutex<HashMap<String, QuakeEvent>>,
    failing: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(events: Vec<QuakeEvent>) -> Self {
        let store = Self::default();
        {
            let mut map = store.events.lock().unwrap();
            for event in events {
                map.insert(event.id.clone(), event);
            }
        }
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.events.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Db(DbError::Migration(
                "simulated storage failure".to_string(),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn put_all(&self, events: &[QuakeEvent]) -> Result<usize, StorageError> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut map = self.events.lock().unwrap();
        for event in events {
            map.insert(event.id.clone(), event.clone());
        }
        Ok(events.len())
    }

    async fn get_all(&self) -> Result<Vec<QuakeEvent>, StorageError> {
        self.check()?;
        Ok(self.events.lock().unwrap().values().cloned().collect())
    }

    async fn get_by_time_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<QuakeEvent>, StorageError> {
        self.check()?;
        Ok(self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|event| event.time >= start && event.time <= end)
            .cloned()
            .collect())
    }

    async fn evict_before(&self, cutoff_ms: i64) -> Result<usize, StorageError> {
        self.check()?;
        let mut map = self.events.lock().unwrap();
        let before = map.len();
        map.retain(|_, event| event.time >= cutoff_ms);
        Ok(before - map.len())
    }
}

/// Notifier that records every alert it is asked to deliver.
#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<QuakeAlert>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn alert_ids(&self) -> Vec<String> {
        self.alerts
            .lock()
            .unwrap()
            .iter()
            .map(|alert| alert.event_id.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, alert: &QuakeAlert) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("platform refused".to_string()));
        }
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}
