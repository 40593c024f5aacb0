// Encoded blob store
//
// Pure key -> encoded value maps. One table per logical store; no metadata is
// kept alongside the value. Size and MIME rules are enforced by callers.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The two logical blob stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobStore {
    Videos,
    Thumbnails,
}

impl BlobStore {
    pub fn table(&self) -> &'static str {
        match self {
            BlobStore::Videos => "videos",
            BlobStore::Thumbnails => "thumbnails",
        }
    }
}

impl std::fmt::Display for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// Insert or overwrite the value stored under `key`.
pub fn put_blob(conn: &Connection, store: BlobStore, key: &str, encoded: &str) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO {} (key, data) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET data = excluded.data",
            store.table()
        ),
        params![key, encoded],
    )?;
    Ok(())
}

pub fn get_blob(conn: &Connection, store: BlobStore, key: &str) -> Result<Option<String>> {
    let result = conn
        .query_row(
            &format!("SELECT data FROM {} WHERE key = ?1", store.table()),
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(result)
}

/// Delete the value under `key`. Deleting an absent key is not an error.
/// Returns whether a value was actually removed.
pub fn delete_blob(conn: &Connection, store: BlobStore, key: &str) -> Result<bool> {
    let removed = conn.execute(
        &format!("DELETE FROM {} WHERE key = ?1", store.table()),
        params![key],
    )?;
    Ok(removed > 0)
}

pub fn blob_exists(conn: &Connection, store: BlobStore, key: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            &format!("SELECT 1 FROM {} WHERE key = ?1", store.table()),
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn count_blobs(conn: &Connection, store: BlobStore) -> Result<i64> {
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", store.table()),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
