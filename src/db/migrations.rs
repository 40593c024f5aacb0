// Database migrations
// Migrations are forward-only. Never edit or delete a migration after it ships.
// New stores are added in new migrations so older libraries keep their data.

use rusqlite::Connection;

use crate::error::{Result, VidShelfError};

/// All migrations in order. Each migration is a SQL string.
const MIGRATIONS: &[&str] = &[
    // Migration 1: video blobs + metadata catalog
    r#"
    CREATE TABLE IF NOT EXISTS videos (
        key TEXT PRIMARY KEY NOT NULL,
        data TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS metadata (
        id INTEGER PRIMARY KEY NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        sort_order INTEGER NOT NULL DEFAULT 0,
        file_name TEXT NOT NULL,
        url TEXT NOT NULL,
        thumbnail_url TEXT,
        video_id TEXT,
        thumbnail_id TEXT,
        has_thumbnail INTEGER NOT NULL DEFAULT 0,
        timestamp TEXT NOT NULL,
        last_updated TEXT
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_metadata_file_name ON metadata(file_name);
    CREATE INDEX IF NOT EXISTS idx_metadata_order ON metadata(sort_order);
    "#,

    // Migration 2: thumbnail blobs
    r#"
    CREATE TABLE IF NOT EXISTS thumbnails (
        key TEXT PRIMARY KEY NOT NULL,
        data TEXT NOT NULL
    );
    "#,

    // Migration 3: persisted library settings
    r#"
    CREATE TABLE IF NOT EXISTS library_settings (
        key TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL
    );
    "#,
];

/// Schema version this build migrates to
pub fn latest_version() -> u32 {
    MIGRATIONS.len() as u32
}

/// Get current schema version
pub fn get_schema_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version)
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    migrate_to(conn, latest_version())
}

/// Apply pending migrations up to (and including) `target_version`.
pub(crate) fn migrate_to(conn: &Connection, target_version: u32) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version > latest_version() {
        return Err(VidShelfError::StorageFailure(format!(
            "Library schema version {} is newer than this build supports (max {})",
            current_version,
            latest_version()
        )));
    }

    if current_version >= target_version {
        return Ok(());
    }

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as u32;
        if migration_version <= current_version || migration_version > target_version {
            continue;
        }

        conn.execute_batch(&format!(
            "BEGIN;\n{}\nPRAGMA user_version = {};\nCOMMIT;",
            migration, migration_version
        ))?;

        log::info!("Applied library migration {}", migration_version);
    }

    Ok(())
}
