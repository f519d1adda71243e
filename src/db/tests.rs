//! Database operations unit tests

#[cfg(test)]
mod tests {
    use crate::db::{queries, Database};
    use chrono::Utc;

    fn row(id: &str, magnitude: f64, time: i64) -> queries::QuakeEventRow {
        queries::QuakeEventRow {
            id: id.to_string(),
            magnitude,
            place: format!("near {id}"),
            time,
            latitude: 1.5,
            longitude: 2.5,
            depth: 10.0,
            url: format!("https://example.test/{id}"),
            felt: None,
            alert: None,
            edited_by_admin: false,
            original_magnitude: None,
        }
    }

    #[test]
    fn test_migrations_are_idempotent_on_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("quakewatch.db");

        {
            let db = Database::open(&path).expect("first open");
            queries::upsert_quake_events(&db, &[row("a", 3.0, 10)], &Utc::now().to_rfc3339())
                .unwrap();
        }

        let db = Database::open(&path).expect("second open");
        assert_eq!(queries::count_quake_events(&db).unwrap(), 1);
    }

    #[test]
    fn test_fresh_schema_is_a_single_migration() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.conn().unwrap();
        let versions: Vec<i64> = conn
            .prepare("SELECT version FROM _migrations ORDER BY version")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(versions, vec![1]);

        let moderated: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('quake_events')
                 WHERE name IN ('edited_by_admin', 'original_magnitude')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(moderated, 2);
    }

    #[test]
    fn test_upsert_replaces_existing_row() {
        let db = Database::open_in_memory().expect("in-memory DB");
        let now = Utc::now().to_rfc3339();

        queries::upsert_quake_events(&db, &[row("a", 3.0, 10)], &now).unwrap();
        let mut revised = row("a", 3.4, 10);
        revised.felt = Some(7);
        revised.alert = Some("green".to_string());
        queries::upsert_quake_events(&db, &[revised.clone()], &now).unwrap();

        assert_eq!(queries::count_quake_events(&db).unwrap(), 1);
        let stored = queries::get_quake_event(&db, "a").unwrap().unwrap();
        assert_eq!(stored, revised);
    }

    #[test]
    fn test_time_range_is_inclusive_and_newest_first() {
        let db = Database::open_in_memory().expect("in-memory DB");
        let now = Utc::now().to_rfc3339();
        let rows: Vec<_> = [5, 10, 15, 20, 25]
            .iter()
            .map(|t| row(&format!("e{t}"), 2.0, *t))
            .collect();
        queries::upsert_quake_events(&db, &rows, &now).unwrap();

        let found = queries::list_quake_events_between(&db, 10, 20).unwrap();
        let ids: Vec<&str> = found.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["e20", "e15", "e10"]);
    }

    #[test]
    fn test_delete_before_cutoff_is_strict() {
        let db = Database::open_in_memory().expect("in-memory DB");
        let now = Utc::now().to_rfc3339();
        queries::upsert_quake_events(&db, &[row("old", 2.0, 99), row("edge", 2.0, 100)], &now)
            .unwrap();

        let deleted = queries::delete_quake_events_before(&db, 100).unwrap();
        assert_eq!(deleted, 1);
        assert!(queries::get_quake_event(&db, "old").unwrap().is_none());
        assert!(queries::get_quake_event(&db, "edge").unwrap().is_some());
    }

    #[test]
    fn test_settings_round_trip() {
        let db = Database::open_in_memory().expect("in-memory DB");
        assert!(queries::get_setting(&db, "monitor_config").unwrap().is_none());

        queries::upsert_setting(&db, "monitor_config", "{\"a\":1}", "t1").unwrap();
        queries::upsert_setting(&db, "monitor_config", "{\"a\":2}", "t2").unwrap();
        assert_eq!(
            queries::get_setting(&db, "monitor_config").unwrap().as_deref(),
            Some("{\"a\":2}")
        );
    }
}
