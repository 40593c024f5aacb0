// Database module
//
// A library keeps everything in one SQLite file: the encoded blob tables,
// the metadata catalog and the library settings. Connections are cheap and
// short-lived; every operation opens its own via Store::connect().

pub mod blobs;
pub mod catalog;
pub mod migrations;
pub mod settings;

use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::constants::{DB_BUSY_TIMEOUT_MS, DB_FILENAME, VIDSHELF_FOLDER};
use crate::error::Result;

/// Handle to a library database. Holds only the path, never a Connection.
#[derive(Debug, Clone)]
pub struct Store {
    db_path: PathBuf,
}

impl Store {
    /// Open (or create) the library rooted at `library_root`.
    /// Creates the .vidshelf folder and applies pending migrations.
    /// Safe to call repeatedly.
    pub fn open(library_root: &Path) -> Result<Self> {
        Self::open_at(&get_db_path(library_root))
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = Store {
            db_path: db_path.to_path_buf(),
        };
        let conn = store.connect()?;
        migrations::run_migrations(&conn)?;
        Ok(store)
    }

    /// Open a short-lived connection with pragmas set. Does NOT run migrations.
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL; PRAGMA busy_timeout = {};",
            DB_BUSY_TIMEOUT_MS
        ))?;
        Ok(conn)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

/// Get the database path for a library root
pub fn get_db_path(library_root: &Path) -> PathBuf {
    library_root.join(VIDSHELF_FOLDER).join(DB_FILENAME)
}

/// Whether a library has already been initialized at this root
pub fn library_exists(library_root: &Path) -> bool {
    get_db_path(library_root).exists()
}
