// VidShelf Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VidShelfError {
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Invalid thumbnail: {0}")]
    InvalidThumbnail(String),

    #[error("Video is too large ({size} bytes). The maximum is {max} bytes.")]
    OversizeVideo { size: u64, max: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VidShelfError {
    /// True for failures of the underlying storage engine (quota, engine
    /// unavailable, corrupt entries) as opposed to caller-facing rejections.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            VidShelfError::StorageFailure(_) | VidShelfError::Database(_) | VidShelfError::Io(_)
        )
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, VidShelfError::ConstraintViolation(_))
    }
}

impl From<rusqlite::Error> for VidShelfError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, msg)
                if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                VidShelfError::ConstraintViolation(
                    msg.clone().unwrap_or_else(|| "unique constraint failed".to_string()),
                )
            }
            _ => VidShelfError::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, VidShelfError>;
