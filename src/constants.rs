// VidShelf Constants
// Reference prefixes are persisted inside catalog records. Changing them breaks existing libraries.

// Upload limits
pub const MAX_VIDEO_SIZE_BYTES: u64 = 50 * 1024 * 1024; // 50MB
pub const MAX_THUMBNAIL_SIZE_BYTES: u64 = 2 * 1024 * 1024; // 2MB
pub const THUMBNAIL_MIME_PREFIX: &str = "image/";
pub const DEFAULT_VIDEO_ORDER: i64 = 1;

// Blob reference scheme
pub const LOCAL_VIDEO_PREFIX: &str = "localblob://";
pub const LOCAL_THUMBNAIL_PREFIX: &str = "localblob-thumb://";

// Storage key generation
pub const VIDEO_KEY_PREFIX: &str = "video";
pub const THUMBNAIL_KEY_PREFIX: &str = "thumb";
pub const KEY_RANDOM_LEN: usize = 9;

// Remote object paths
pub const REMOTE_VIDEO_DIR: &str = "videos";
pub const REMOTE_THUMBNAIL_DIR: &str = "thumbnails";
pub const REMOTE_WRITE_CHUNK_SIZE: usize = 256 * 1024; // 256KB

// Paths
pub const VIDSHELF_FOLDER: &str = ".vidshelf";
pub const DB_FILENAME: &str = "vidshelf.db";
pub const DEFAULT_LIBRARY_DIR: &str = ".vidshelf-library";
pub const DB_BUSY_TIMEOUT_MS: u32 = 5000;

// Synthetic upload progress
pub const PROGRESS_STEP_PERCENT: u8 = 10;
pub const PROGRESS_CEILING_PERCENT: u8 = 90;
pub const PROGRESS_COMPLETE_PERCENT: u8 = 100;
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 200;

// Environment overrides
pub const ENV_LIBRARY: &str = "VIDSHELF_LIBRARY";
pub const ENV_BACKEND: &str = "VIDSHELF_BACKEND";
pub const ENV_REMOTE_ROOT: &str = "VIDSHELF_REMOTE_ROOT";
pub const ENV_PROGRESS_INTERVAL_MS: &str = "VIDSHELF_PROGRESS_INTERVAL_MS";
pub const ENV_LOG: &str = "VIDSHELF_LOG";

// Persisted library settings keys
pub const SETTING_BACKEND: &str = "storage_backend";
pub const SETTING_REMOTE_ROOT: &str = "remote_root";
