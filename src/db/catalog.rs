// Metadata catalog
//
// One row per video, keyed by the numeric id the cache assigns. file_name is
// unique at the storage level; sort_order is indexed for range queries.
// Blob lifecycle is not handled here.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::error::Result;

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub order: i64,
    pub file_name: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub video_id: Option<String>,
    pub thumbnail_id: Option<String>,
    pub has_thumbnail: bool,
    pub timestamp: String,
    pub last_updated: Option<String>,
}

const RECORD_COLUMNS: &str = "id, title, description, sort_order, file_name, url, thumbnail_url,
     video_id, thumbnail_id, has_thumbnail, timestamp, last_updated";

fn map_record(row: &rusqlite::Row) -> rusqlite::Result<VideoRecord> {
    Ok(VideoRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        order: row.get(3)?,
        file_name: row.get(4)?,
        url: row.get(5)?,
        thumbnail_url: row.get(6)?,
        video_id: row.get(7)?,
        thumbnail_id: row.get(8)?,
        has_thumbnail: row.get::<_, i64>(9)? != 0,
        timestamp: row.get(10)?,
        last_updated: row.get(11)?,
    })
}

/// Insert or replace by id. A different id carrying an existing file_name
/// fails with ConstraintViolation.
pub fn put_record(conn: &Connection, record: &VideoRecord) -> Result<VideoRecord> {
    conn.execute(
        "INSERT INTO metadata (id, title, description, sort_order, file_name, url, thumbnail_url,
                               video_id, thumbnail_id, has_thumbnail, timestamp, last_updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            description = excluded.description,
            sort_order = excluded.sort_order,
            file_name = excluded.file_name,
            url = excluded.url,
            thumbnail_url = excluded.thumbnail_url,
            video_id = excluded.video_id,
            thumbnail_id = excluded.thumbnail_id,
            has_thumbnail = excluded.has_thumbnail,
            timestamp = excluded.timestamp,
            last_updated = excluded.last_updated",
        params![
            record.id,
            record.title,
            record.description,
            record.order,
            record.file_name,
            record.url,
            record.thumbnail_url,
            record.video_id,
            record.thumbnail_id,
            record.has_thumbnail as i64,
            record.timestamp,
            record.last_updated,
        ],
    )?;
    Ok(record.clone())
}

/// All records, in storage order (no ordering guarantee for callers).
pub fn get_all_records(conn: &Connection) -> Result<Vec<VideoRecord>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM metadata", RECORD_COLUMNS))?;
    let records = stmt
        .query_map([], map_record)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

pub fn get_record(conn: &Connection, id: i64) -> Result<Option<VideoRecord>> {
    let result = conn
        .query_row(
            &format!("SELECT {} FROM metadata WHERE id = ?1", RECORD_COLUMNS),
            params![id],
            map_record,
        )
        .optional()?;
    Ok(result)
}

pub fn find_record_by_file_name(conn: &Connection, file_name: &str) -> Result<Option<VideoRecord>> {
    let result = conn
        .query_row(
            &format!("SELECT {} FROM metadata WHERE file_name = ?1", RECORD_COLUMNS),
            params![file_name],
            map_record,
        )
        .optional()?;
    Ok(result)
}

/// Records whose order falls in `range`, ascending by order then id.
pub fn list_records_by_order(
    conn: &Connection,
    range: RangeInclusive<i64>,
) -> Result<Vec<VideoRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM metadata WHERE sort_order BETWEEN ?1 AND ?2 ORDER BY sort_order, id",
        RECORD_COLUMNS
    ))?;
    let records = stmt
        .query_map(params![range.start(), range.end()], map_record)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// Delete by id. Deleting an absent id is not an error.
pub fn delete_record(conn: &Connection, id: i64) -> Result<bool> {
    let removed = conn.execute("DELETE FROM metadata WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}

pub fn count_records(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM metadata", [], |row| row.get(0))?;
    Ok(count)
}
