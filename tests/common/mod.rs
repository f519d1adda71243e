//! Shared helpers for the end-to-end tests.

use std::sync::Arc;

use chrono::Utc;
use quakewatch_lib::bus::BusEvent;
use quakewatch_lib::config::MonitorConfig;
use quakewatch_lib::db::Database;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::broadcast;

pub const MS_PER_MINUTE: i64 = 60_000;

/// One feature in the summary feed: id, magnitude, age in minutes, lat, lng.
pub type FeatureRow<'a> = (&'a str, f64, i64, f64, f64);

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn feed_body(features: &[FeatureRow<'_>]) -> Value {
    let now = now_ms();
    let features: Vec<Value> = features
        .iter()
        .map(|(id, mag, age_minutes, lat, lng)| {
            json!({
                "type": "Feature",
                "id": id,
                "properties": {
                    "mag": mag,
                    "place": format!("somewhere near {id}"),
                    "time": now - age_minutes * MS_PER_MINUTE,
                    "url": format!("https://example.test/event/{id}"),
                    "felt": 3
                },
                "geometry": { "type": "Point", "coordinates": [lng, lat, 12.5] }
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "metadata": { "count": features.len() },
        "features": features
    })
}

/// An on-disk database in a scratch directory. Keep the `TempDir` alive
/// for as long as the database is used.
pub fn temp_db() -> (TempDir, Arc<Database>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let db = Database::open(dir.path().join("quakewatch.db")).expect("open database");
    (dir, Arc::new(db))
}

/// Config pointed at a mock feed with near-instant retries.
pub fn test_config(base_url: String) -> MonitorConfig {
    MonitorConfig {
        feed_base_url: base_url,
        timeout_ms: 2_000,
        retry_base_delay_ms: 1,
        ..MonitorConfig::default()
    }
}

pub fn drain(rx: &mut broadcast::Receiver<BusEvent>) -> Vec<BusEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn of_type<'a>(events: &'a [BusEvent], event_type: &str) -> Vec<&'a BusEvent> {
    events
        .iter()
        .filter(|event| event.event_type == event_type)
        .collect()
}
