use rusqlite::Connection;

use super::DbError;

struct Migration {
    version: i64,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: r#"
CREATE TABLE quake_events (
    id                  TEXT PRIMARY KEY,
    magnitude           REAL NOT NULL,
    place               TEXT NOT NULL,
    time                INTEGER NOT NULL,
    latitude            REAL NOT NULL,
    longitude           REAL NOT NULL,
    depth               REAL NOT NULL,
    url                 TEXT NOT NULL,
    felt                INTEGER,
    alert               TEXT,
    edited_by_admin     INTEGER NOT NULL DEFAULT 0,
    original_magnitude  REAL,
    cached_at           TEXT NOT NULL
);

CREATE INDEX idx_quake_events_time ON quake_events(time);

CREATE TABLE settings (
    key         TEXT PRIMARY KEY,
    value_json  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
"#,
    },
];

pub(super) fn run_migrations(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version     INTEGER PRIMARY KEY,
            applied_at  TEXT NOT NULL
        );",
    )?;

    let applied: Vec<i64> = {
        let mut stmt = conn.prepare("SELECT version FROM _migrations ORDER BY version")?;
        let result = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        result
    };

    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }

        tracing::info!("applying migration v{}", migration.version);

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql)
            .map_err(|e| DbError::Migration(format!("v{}: {e}", migration.version)))?;
        tx.execute(
            "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
            rusqlite::params![migration.version],
        )?;
        tx.commit()?;
    }

    Ok(())
}
