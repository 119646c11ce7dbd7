use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Stored snapshot is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored timestamp out of range: {0}")]
    InvalidTimestamp(i64),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A persisted bookmark. `T` is the repository snapshot, stored verbatim as JSON.
///
/// Field names match the documents the HTTP API hands out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBookmark<T> {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    pub repo: T,
    #[serde(rename = "lastSeen")]
    pub last_seen: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Bookmark persistence on SQLite
///
/// Every operation is scoped to an owner id; there is no way to reach
/// another user's rows through this API.
pub struct BookmarkStore {
    conn: Mutex<Connection>,
}

/// Row as read from SQLite, before the snapshot is decoded
struct RawRow {
    id: String,
    user: String,
    repo: String,
    last_seen: i64,
    note: Option<String>,
    tags: String,
}

const SELECT_COLUMNS: &str = "id, user_id, repo, last_seen, note, tags";

impl BookmarkStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref();
        let conn = Connection::open(path)?;

        // WAL so the list endpoint doesn't block behind writers
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init_schema(&conn)?;

        info!("Bookmark store opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS bookmarks (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL,
                repo        TEXT NOT NULL,
                last_seen   INTEGER NOT NULL,
                note        TEXT,
                tags        TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS idx_bookmarks_user_seen
                ON bookmarks(user_id, last_seen);",
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Persist a new bookmark stamped with the current time
    pub fn insert<T>(&self, owner: &str, repo: &T) -> Result<StoredBookmark<T>>
    where
        T: Serialize + Clone,
    {
        let id = uuid::Uuid::new_v4().to_string();
        // stored at microsecond precision, so hand back exactly what a read returns
        let last_seen = Utc::now().trunc_subsecs(6);
        let repo_json = serde_json::to_string(repo)?;

        self.lock()?.execute(
            "INSERT INTO bookmarks (id, user_id, repo, last_seen, note, tags)
             VALUES (?1, ?2, ?3, ?4, NULL, '[]')",
            params![id, owner, repo_json, last_seen.timestamp_micros()],
        )?;

        debug!("Inserted bookmark {} for {}", id, owner);

        Ok(StoredBookmark {
            id,
            user: owner.to_string(),
            repo: repo.clone(),
            last_seen,
            note: None,
            tags: Vec::new(),
        })
    }

    /// Owner's bookmarks, most recently seen first
    pub fn list_by_owner<T: DeserializeOwned>(&self, owner: &str) -> Result<Vec<StoredBookmark<T>>> {
        let raw = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM bookmarks WHERE user_id = ?1
                 ORDER BY last_seen DESC, rowid DESC",
                SELECT_COLUMNS
            ))?;
            let rows = stmt.query_map([owner], read_row)?;
            let raw: Vec<RawRow> = rows.collect::<rusqlite::Result<_>>()?;
            raw
        };

        raw.into_iter().map(decode).collect()
    }

    /// Returns false when no bookmark with this id belongs to `owner`
    pub fn delete(&self, owner: &str, id: &str) -> Result<bool> {
        let removed = self.lock()?.execute(
            "DELETE FROM bookmarks WHERE id = ?1 AND user_id = ?2",
            params![id, owner],
        )?;
        Ok(removed > 0)
    }

    /// Replace the note and/or tags of a bookmark.
    ///
    /// `Some(None)` for `note` clears it; a `None` argument leaves that column alone.
    /// Returns `None` when the id does not belong to `owner`.
    pub fn update_annotations<T: DeserializeOwned>(
        &self,
        owner: &str,
        id: &str,
        note: Option<Option<&str>>,
        tags: Option<&[String]>,
    ) -> Result<Option<StoredBookmark<T>>> {
        let raw = {
            let conn = self.lock()?;

            if query_one(&conn, owner, id)?.is_none() {
                return Ok(None);
            }

            if let Some(note) = note {
                conn.execute(
                    "UPDATE bookmarks SET note = ?1 WHERE id = ?2 AND user_id = ?3",
                    params![note, id, owner],
                )?;
            }

            if let Some(tags) = tags {
                conn.execute(
                    "UPDATE bookmarks SET tags = ?1 WHERE id = ?2 AND user_id = ?3",
                    params![serde_json::to_string(tags)?, id, owner],
                )?;
            }

            query_one(&conn, owner, id)?
        };

        raw.map(decode).transpose()
    }

}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        user: row.get(1)?,
        repo: row.get(2)?,
        last_seen: row.get(3)?,
        note: row.get(4)?,
        tags: row.get(5)?,
    })
}

fn query_one(conn: &Connection, owner: &str, id: &str) -> Result<Option<RawRow>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {} FROM bookmarks WHERE id = ?1 AND user_id = ?2",
                SELECT_COLUMNS
            ),
            params![id, owner],
            read_row,
        )
        .optional()?;
    Ok(row)
}

fn decode<T: DeserializeOwned>(raw: RawRow) -> Result<StoredBookmark<T>> {
    let last_seen = DateTime::<Utc>::from_timestamp_micros(raw.last_seen)
        .ok_or(StoreError::InvalidTimestamp(raw.last_seen))?;

    Ok(StoredBookmark {
        id: raw.id,
        user: raw.user,
        repo: serde_json::from_str(&raw.repo)?,
        last_seen,
        note: raw.note,
        tags: serde_json::from_str(&raw.tags)?,
    })
}
