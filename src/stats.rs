//! Aggregates derived from a snapshot for the stat counters and charts.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use serde::Serialize;

use crate::feed::QuakeEvent;
use crate::monitor::Snapshot;

const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Upper bounds (exclusive) of the magnitude histogram buckets; the last
/// bucket is open-ended.
const MAGNITUDE_BUCKET_EDGES: [f64; 5] = [2.0, 3.0, 4.0, 5.0, 6.0];
const MAGNITUDE_BUCKET_LABELS: [&str; 6] = ["<2", "2-3", "3-4", "4-5", "5-6", "6+"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotStats {
    pub total: usize,
    pub significant: usize,
    pub strongest_id: Option<String>,
    pub strongest_magnitude: Option<f64>,
    pub mean_depth_km: Option<f64>,
    pub last_hour: usize,
    pub last_day: usize,
    pub felt_reports: i64,
    pub degraded: bool,
}

impl SnapshotStats {
    pub fn compute(snapshot: &Snapshot, threshold: f64, now_ms: i64) -> Self {
        let events = snapshot.events();
        let strongest = events
            .iter()
            .max_by(|a, b| a.magnitude.total_cmp(&b.magnitude));
        let mean_depth_km = if events.is_empty() {
            None
        } else {
            Some(events.iter().map(|event| event.depth).sum::<f64>() / events.len() as f64)
        };

        Self {
            total: events.len(),
            significant: events.iter().filter(|e| e.magnitude >= threshold).count(),
            strongest_id: strongest.map(|event| event.id.clone()),
            strongest_magnitude: strongest.map(|event| event.magnitude),
            mean_depth_km,
            last_hour: events.iter().filter(|e| e.time >= now_ms - MS_PER_HOUR).count(),
            last_day: events.iter().filter(|e| e.time >= now_ms - MS_PER_DAY).count(),
            felt_reports: events
                .iter()
                .filter_map(|e| e.felt)
                .fold(0i64, |total, felt| total.saturating_add(felt)),
            degraded: snapshot.degraded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MagnitudeBucket {
    pub label: &'static str,
    pub count: usize,
}

pub fn magnitude_histogram(events: &[QuakeEvent]) -> Vec<MagnitudeBucket> {
    let mut counts = [0usize; MAGNITUDE_BUCKET_LABELS.len()];
    for event in events {
        let idx = MAGNITUDE_BUCKET_EDGES
            .iter()
            .position(|edge| event.magnitude < *edge)
            .unwrap_or(MAGNITUDE_BUCKET_EDGES.len());
        counts[idx] += 1;
    }
    MAGNITUDE_BUCKET_LABELS
        .into_iter()
        .zip(counts)
        .map(|(label, count)| MagnitudeBucket { label, count })
        .collect()
}

/// Event counts per UTC calendar day, oldest day first.
pub fn daily_counts(events: &[QuakeEvent]) -> Vec<(NaiveDate, usize)> {
    let mut by_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for event in events {
        if let Some(time) = DateTime::from_timestamp_millis(event.time) {
            *by_day.entry(time.date_naive()).or_insert(0) += 1;
        }
    }
    by_day.into_iter().collect()
}
