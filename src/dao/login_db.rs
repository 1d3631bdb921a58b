use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

use crate::model::RawLoginRow;

/// Local login-history store, the input boundary of the pipeline. One row
/// per login event; queries aggregate to one row per (client_ip, user_name).
#[derive(Clone)]
pub struct LoginDb {
    conn: Arc<Mutex<Connection>>,
}

impl LoginDb {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS login_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_timestamp TEXT NOT NULL,
                client_ip TEXT NOT NULL,
                user_name TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_login_history_ts ON login_history(event_timestamp)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_login_history_user ON login_history(user_name)",
            [],
        )?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn insert_login(&self, timestamp: NaiveDateTime, client_ip: &str, user_name: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO login_history (event_timestamp, client_ip, user_name) VALUES (?1, ?2, ?3)",
            params![timestamp.format("%Y-%m-%d %H:%M:%S").to_string(), client_ip, user_name],
        )?;
        Ok(())
    }

    /// Fetches one row per distinct (client_ip, user_name) pair within the
    /// inclusive date range, optionally filtered to a single user.
    pub fn fetch_login_history(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        user_name: Option<&str>,
    ) -> Result<Vec<RawLoginRow>> {
        let start = format!("{} 00:00:00", start_date.format("%Y-%m-%d"));
        let end = format!("{} 23:59:59", end_date.format("%Y-%m-%d"));

        let conn = self.conn.lock().unwrap();
        let mut rows = Vec::new();

        let map_row = |row: &rusqlite::Row| -> rusqlite::Result<RawLoginRow> {
            Ok(RawLoginRow {
                client_ip: row.get(0)?,
                user_name: row.get(1)?,
                login_count: row.get::<_, i64>(2)? as u64,
            })
        };

        match user_name {
            Some(user) => {
                let mut stmt = conn.prepare(
                    "SELECT client_ip, user_name, COUNT(*) as login_count
                     FROM login_history
                     WHERE event_timestamp BETWEEN ?1 AND ?2 AND user_name = ?3
                     GROUP BY client_ip, user_name
                     ORDER BY client_ip, user_name",
                )?;
                let mapped = stmt.query_map(params![start, end, user], map_row)?;
                for row in mapped {
                    rows.push(row?);
                }
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT client_ip, user_name, COUNT(*) as login_count
                     FROM login_history
                     WHERE event_timestamp BETWEEN ?1 AND ?2
                     GROUP BY client_ip, user_name
                     ORDER BY client_ip, user_name",
                )?;
                let mapped = stmt.query_map(params![start, end], map_row)?;
                for row in mapped {
                    rows.push(row?);
                }
            }
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(date: &str, time: &str) -> NaiveDateTime {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        let parts: Vec<u32> = time.split(':').map(|p| p.parse().unwrap()).collect();
        date.and_hms_opt(parts[0], parts[1], parts[2]).unwrap()
    }

    fn seeded_db() -> (tempfile::TempDir, LoginDb) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logins.db");
        let db = LoginDb::new(path.to_str().unwrap()).unwrap();

        db.insert_login(ts("2024-06-12", "08:00:00"), "1.1.1.1", "alice").unwrap();
        db.insert_login(ts("2024-06-12", "09:30:00"), "1.1.1.1", "alice").unwrap();
        db.insert_login(ts("2024-06-12", "10:00:00"), "2.2.2.2", "bob").unwrap();
        db.insert_login(ts("2024-06-13", "23:59:59"), "2.2.2.2", "bob").unwrap();
        db.insert_login(ts("2024-06-14", "00:00:01"), "3.3.3.3", "carol").unwrap();

        (dir, db)
    }

    #[test]
    fn test_fetch_groups_by_ip_and_user() {
        let (_dir, db) = seeded_db();
        let start = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 13).unwrap();

        let rows = db.fetch_login_history(start, end, None).unwrap();
        assert_eq!(
            rows,
            vec![
                RawLoginRow {
                    client_ip: "1.1.1.1".to_string(),
                    user_name: "alice".to_string(),
                    login_count: 2,
                },
                RawLoginRow {
                    client_ip: "2.2.2.2".to_string(),
                    user_name: "bob".to_string(),
                    login_count: 2,
                },
            ]
        );
    }

    #[test]
    fn test_fetch_respects_user_filter() {
        let (_dir, db) = seeded_db();
        let start = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();

        let rows = db.fetch_login_history(start, end, Some("bob")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_name, "bob");
        assert_eq!(rows[0].login_count, 2);
    }

    #[test]
    fn test_fetch_date_range_is_inclusive_of_end_day() {
        let (_dir, db) = seeded_db();
        let start = NaiveDate::from_ymd_opt(2024, 6, 13).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 13).unwrap();

        let rows = db.fetch_login_history(start, end, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].client_ip, "2.2.2.2");
        assert_eq!(rows[0].login_count, 1);
    }

    #[test]
    fn test_fetch_empty_window() {
        let (_dir, db) = seeded_db();
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();

        let rows = db.fetch_login_history(start, end, None).unwrap();
        assert!(rows.is_empty());
    }
}
