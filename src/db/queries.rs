use rusqlite::{params, Row};
use serde::Serialize;

use super::{Database, DbError};

// ---------------------------------------------------------------------------
// Row types: flat structs that map directly to table columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuakeEventRow {
    pub id: String,
    pub magnitude: f64,
    pub place: String,
    pub time: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub depth: f64,
    pub url: String,
    pub felt: Option<i64>,
    pub alert: Option<String>,
    pub edited_by_admin: bool,
    pub original_magnitude: Option<f64>,
}

const QUAKE_EVENT_COLUMNS: &str = "id, magnitude, place, time, latitude, longitude, depth, url, \
     felt, alert, edited_by_admin, original_magnitude";

fn map_quake_event_row(row: &Row<'_>) -> rusqlite::Result<QuakeEventRow> {
    Ok(QuakeEventRow {
        id: row.get(0)?,
        magnitude: row.get(1)?,
        place: row.get(2)?,
        time: row.get(3)?,
        latitude: row.get(4)?,
        longitude: row.get(5)?,
        depth: row.get(6)?,
        url: row.get(7)?,
        felt: row.get(8)?,
        alert: row.get(9)?,
        edited_by_admin: row.get::<_, i64>(10)? != 0,
        original_magnitude: row.get(11)?,
    })
}

// ---------------------------------------------------------------------------
// Quake event queries
// ---------------------------------------------------------------------------

/// Insert or replace every row in one transaction. Last write wins per id.
pub fn upsert_quake_events(
    db: &Database,
    rows: &[QuakeEventRow],
    cached_at: &str,
) -> Result<usize, DbError> {
    let mut conn = db.conn()?;
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO quake_events (
                id, magnitude, place, time, latitude, longitude, depth, url,
                felt, alert, edited_by_admin, original_magnitude, cached_at
             )
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(id) DO UPDATE SET
                magnitude = excluded.magnitude,
                place = excluded.place,
                time = excluded.time,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                depth = excluded.depth,
                url = excluded.url,
                felt = excluded.felt,
                alert = excluded.alert,
                edited_by_admin = excluded.edited_by_admin,
                original_magnitude = excluded.original_magnitude,
                cached_at = excluded.cached_at",
        )?;
        for row in rows {
            stmt.execute(params![
                row.id,
                row.magnitude,
                row.place,
                row.time,
                row.latitude,
                row.longitude,
                row.depth,
                row.url,
                row.felt,
                row.alert,
                row.edited_by_admin as i64,
                row.original_magnitude,
                cached_at
            ])?;
        }
    }
    tx.commit()?;
    Ok(rows.len())
}

pub fn list_quake_events(db: &Database) -> Result<Vec<QuakeEventRow>, DbError> {
    let conn = db.conn()?;
    let mut stmt = conn.prepare(&format!("SELECT {QUAKE_EVENT_COLUMNS} FROM quake_events"))?;
    let rows = stmt
        .query_map([], map_quake_event_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Rows with `start <= time <= end`, newest first.
pub fn list_quake_events_between(
    db: &Database,
    start: i64,
    end: i64,
) -> Result<Vec<QuakeEventRow>, DbError> {
    let conn = db.conn()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {QUAKE_EVENT_COLUMNS} FROM quake_events
         WHERE time >= ?1 AND time <= ?2
         ORDER BY time DESC"
    ))?;
    let rows = stmt
        .query_map(params![start, end], map_quake_event_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_quake_event(db: &Database, id: &str) -> Result<Option<QuakeEventRow>, DbError> {
    let conn = db.conn()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {QUAKE_EVENT_COLUMNS} FROM quake_events WHERE id = ?1"
    ))?;
    let mut rows = stmt.query_map(params![id], map_quake_event_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Delete rows whose event time is strictly before `cutoff_ms`.
pub fn delete_quake_events_before(db: &Database, cutoff_ms: i64) -> Result<usize, DbError> {
    let conn = db.conn()?;
    let deleted = conn.execute(
        "DELETE FROM quake_events WHERE time < ?1",
        params![cutoff_ms],
    )?;
    Ok(deleted)
}

pub fn count_quake_events(db: &Database) -> Result<i64, DbError> {
    let conn = db.conn()?;
    let count = conn.query_row("SELECT COUNT(*) FROM quake_events", [], |row| row.get(0))?;
    Ok(count)
}

// ---------------------------------------------------------------------------
// Settings queries
// ---------------------------------------------------------------------------

pub fn upsert_setting(
    db: &Database,
    key: &str,
    value_json: &str,
    updated_at: &str,
) -> Result<(), DbError> {
    let conn = db.conn()?;
    conn.execute(
        "INSERT INTO settings (key, value_json, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key)
         DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
        params![key, value_json, updated_at],
    )?;
    Ok(())
}

pub fn get_setting(db: &Database, key: &str) -> Result<Option<String>, DbError> {
    let conn = db.conn()?;
    let mut stmt = conn.prepare("SELECT value_json FROM settings WHERE key = ?1")?;
    let mut rows = stmt.query_map(params![key], |row| row.get(0))?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}
