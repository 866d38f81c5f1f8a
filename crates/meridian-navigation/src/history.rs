//! Visited-page and search-term history
//!
//! Writes here are blocking SQLite calls; the browser issues them from its
//! worker pool, never from the event queue.

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};

use crate::router::SearchLog;
use crate::Result;
use meridian_storage::Database;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub visited_at: DateTime<Utc>,
    pub visit_count: i32,
}

#[derive(Clone)]
pub struct HistoryManager {
    db: Database,
}

impl HistoryManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a visit to a URL
    pub fn record_visit(&self, url: &str, title: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        Ok(self.db.with_connection(|conn| {
            let existing: Option<i64> = conn
                .query_row("SELECT id FROM history WHERE url = ?1", [url], |row| {
                    row.get(0)
                })
                .optional()?;

            if let Some(id) = existing {
                conn.execute(
                    "UPDATE history
                     SET title = CASE WHEN ?1 != '' THEN ?1 ELSE title END,
                         visited_at = ?2,
                         visit_count = visit_count + 1
                     WHERE id = ?3",
                    rusqlite::params![title, now, id],
                )?;
            } else {
                conn.execute(
                    "INSERT INTO history (url, title, visited_at, visit_count) VALUES (?1, ?2, ?3, 1)",
                    rusqlite::params![url, title, now],
                )?;
            }

            Ok(())
        })?)
    }

    /// Update the stored title for a URL without incrementing visit count.
    pub fn update_title(&self, url: &str, title: &str) -> Result<()> {
        if title.trim().is_empty() {
            return Ok(());
        }

        Ok(self.db.with_connection(|conn| {
            conn.execute(
                "UPDATE history SET title = ?1 WHERE url = ?2",
                rusqlite::params![title, url],
            )?;
            Ok(())
        })?)
    }

    /// Remember a search term; repeated terms move to the front.
    pub fn record_search(&self, term: &str) -> Result<()> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(());
        }

        Ok(self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO searches (search, searched_at) VALUES (?1, ?2)
                 ON CONFLICT(search) DO UPDATE SET searched_at = excluded.searched_at",
                rusqlite::params![term, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })?)
    }

    /// Most recent search terms first
    pub fn recent_searches(&self, limit: usize) -> Result<Vec<String>> {
        Ok(self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT search FROM searches ORDER BY searched_at DESC, id DESC LIMIT ?1",
            )?;
            let terms: Vec<String> = stmt
                .query_map([limit as i64], |row| row.get(0))?
                .filter_map(|r| r.ok())
                .collect();
            Ok(terms)
        })?)
    }

    /// Get recent history entries
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        Ok(self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, url, title, visited_at, visit_count FROM history
                 ORDER BY visited_at DESC
                 LIMIT ?1",
            )?;

            let entries: Vec<HistoryEntry> = stmt
                .query_map([limit as i64], entry_from_row)?
                .filter_map(|r| r.ok())
                .collect();

            Ok(entries)
        })?)
    }
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let visited_str: String = row.get(3)?;
    let visited_at = DateTime::parse_from_rfc3339(&visited_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(HistoryEntry {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        visited_at,
        visit_count: row.get(4)?,
    })
}

impl SearchLog for HistoryManager {
    fn add_search(&self, term: &str) {
        if let Err(e) = self.record_search(term) {
            tracing::warn!(error = %e, "Failed to record search");
        }
    }

    fn add_visit(&self, url: &str) {
        if let Err(e) = self.record_visit(url, "") {
            tracing::warn!(error = %e, url = %url, "Failed to record visit");
        }
    }
}
