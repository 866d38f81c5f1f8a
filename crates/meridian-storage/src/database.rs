//! Database connection and operations

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::migrations::run_migrations;
use crate::Result;

/// Raw contents of the single-row session table.
///
/// The payload is opaque to the storage layer; decoding (and deciding what to
/// do with a payload that no longer parses) belongs to the session crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    pub payload: String,
    /// RFC 3339 text as written. Kept raw so a corrupt value can be detected
    /// by the reader instead of failing the query.
    pub saved_at: String,
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;

        // WAL so history write-through from workers does not block readers
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            let value = conn
                .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, value, updated_at],
            )?;
            Ok(())
        })?;

        Ok(())
    }

    /// Replace the stored session snapshot.
    pub fn write_session(&self, payload: &str, saved_at: DateTime<Utc>) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO session_state (id, payload, saved_at) VALUES (1, ?1, ?2)",
                rusqlite::params![payload, saved_at.to_rfc3339()],
            )?;
            Ok(())
        })
    }

    pub fn read_session(&self) -> Result<Option<SessionRow>> {
        self.with_connection(|conn| {
            let row = conn
                .query_row(
                    "SELECT payload, saved_at FROM session_state WHERE id = 1",
                    [],
                    |row| {
                        Ok(SessionRow {
                            payload: row.get(0)?,
                            saved_at: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let count: i32 =
                conn.query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_settings_round_trip() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_setting("search_engine").unwrap(), None);

        db.set_setting("search_engine", "https://example.org/?q=%s")
            .unwrap();
        db.set_setting("search_engine", "https://example.net/?q=%s")
            .unwrap();

        assert_eq!(
            db.get_setting("search_engine").unwrap().as_deref(),
            Some("https://example.net/?q=%s")
        );
    }

    #[test]
    fn test_session_row_is_single() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.read_session().unwrap().is_none());

        let first = Utc::now();
        db.write_session("{\"tabs\":[]}", first).unwrap();
        db.write_session("{\"tabs\":[1]}", first).unwrap();

        let row = db.read_session().unwrap().unwrap();
        assert_eq!(row.payload, "{\"tabs\":[1]}");
        assert_eq!(row.saved_at, first.to_rfc3339());
    }
}
