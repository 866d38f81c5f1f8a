//! Bookmark rows and their page thumbnails

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub has_thumbnail: bool,
}

impl Database {
    /// Insert or retitle a bookmark.
    pub fn add_bookmark(&self, url: &str, title: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO bookmarks (url, title, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(url) DO UPDATE SET title = excluded.title",
                rusqlite::params![url, title, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
    }

    /// Attach a thumbnail to the bookmark for `url`, if there is one.
    ///
    /// Returns whether a bookmark row was updated.
    pub fn set_bookmark_thumbnail(&self, url: &str, png: &[u8]) -> Result<bool> {
        self.with_connection(|conn| {
            let updated = conn.execute(
                "UPDATE bookmarks SET thumbnail = ?1 WHERE url = ?2",
                rusqlite::params![png, url],
            )?;
            Ok(updated > 0)
        })
    }

    pub fn bookmarks(&self) -> Result<Vec<Bookmark>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT url, title, created_at, thumbnail IS NOT NULL FROM bookmarks
                 ORDER BY created_at DESC",
            )?;

            let bookmarks = stmt
                .query_map([], |row| {
                    let created_str: String = row.get(2)?;
                    let created_at = DateTime::parse_from_rfc3339(&created_str)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now());

                    Ok(Bookmark {
                        url: row.get(0)?,
                        title: row.get(1)?,
                        created_at,
                        has_thumbnail: row.get(3)?,
                    })
                })?
                .filter_map(|r| r.ok())
                .collect();

            Ok(bookmarks)
        })
    }
}
