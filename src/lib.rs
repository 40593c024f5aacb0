// VidShelf - Library Entry Point
//
// A video library kept in one SQLite file: encoded media blobs, a metadata
// catalog, and an in-memory catalog cache in front of them. Media can also
// live in an external object store, selected by configuration.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod library;
pub mod progress;
pub mod storage;

pub use config::{BackendKind, Config, ConfigOverrides};
pub use db::catalog::VideoRecord;
pub use db::Store;
pub use error::{Result, VidShelfError};
pub use library::{UploadOutcome, UploadRequest, VideoLibrary, VideoPatch};
pub use progress::{progress_channel, ProgressReporter, UploadProgress, UploadStage};
pub use storage::{MediaBackend, MediaFile, MediaPayload};
