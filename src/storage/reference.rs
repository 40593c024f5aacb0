// Blob reference scheme and storage key generation
//
//   localblob://<key>        video in the local blob store
//   localblob-thumb://<key>  thumbnail in the local blob store
//   anything else            opaque external URL, used verbatim

use rand::{distributions::Alphanumeric, Rng};

use crate::constants::{
    KEY_RANDOM_LEN, LOCAL_THUMBNAIL_PREFIX, LOCAL_VIDEO_PREFIX, REMOTE_THUMBNAIL_DIR,
    REMOTE_VIDEO_DIR, THUMBNAIL_KEY_PREFIX, VIDEO_KEY_PREFIX,
};
use crate::db::blobs::BlobStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Thumbnail,
}

impl MediaKind {
    pub fn local_prefix(&self) -> &'static str {
        match self {
            MediaKind::Video => LOCAL_VIDEO_PREFIX,
            MediaKind::Thumbnail => LOCAL_THUMBNAIL_PREFIX,
        }
    }

    pub fn key_prefix(&self) -> &'static str {
        match self {
            MediaKind::Video => VIDEO_KEY_PREFIX,
            MediaKind::Thumbnail => THUMBNAIL_KEY_PREFIX,
        }
    }

    pub fn remote_dir(&self) -> &'static str {
        match self {
            MediaKind::Video => REMOTE_VIDEO_DIR,
            MediaKind::Thumbnail => REMOTE_THUMBNAIL_DIR,
        }
    }

    pub fn blob_store(&self) -> BlobStore {
        match self {
            MediaKind::Video => BlobStore::Videos,
            MediaKind::Thumbnail => BlobStore::Thumbnails,
        }
    }
}

/// A parsed reference string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRef {
    LocalVideo(String),
    LocalThumbnail(String),
    External(String),
}

impl MediaRef {
    /// Parse a stored reference. A local prefix followed by nothing is not a
    /// usable local reference and is kept as an opaque string.
    pub fn parse(reference: &str) -> Self {
        if let Some(key) = reference.strip_prefix(LOCAL_THUMBNAIL_PREFIX) {
            if !key.is_empty() {
                return MediaRef::LocalThumbnail(key.to_string());
            }
        } else if let Some(key) = reference.strip_prefix(LOCAL_VIDEO_PREFIX) {
            if !key.is_empty() {
                return MediaRef::LocalVideo(key.to_string());
            }
        }
        MediaRef::External(reference.to_string())
    }

    pub fn local(kind: MediaKind, key: &str) -> Self {
        match kind {
            MediaKind::Video => MediaRef::LocalVideo(key.to_string()),
            MediaKind::Thumbnail => MediaRef::LocalThumbnail(key.to_string()),
        }
    }

    /// The local key, if this reference points into the local store for `kind`.
    pub fn local_key(&self, kind: MediaKind) -> Option<&str> {
        match (self, kind) {
            (MediaRef::LocalVideo(key), MediaKind::Video) => Some(key),
            (MediaRef::LocalThumbnail(key), MediaKind::Thumbnail) => Some(key),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaRef::LocalVideo(key) => write!(f, "{}{}", LOCAL_VIDEO_PREFIX, key),
            MediaRef::LocalThumbnail(key) => write!(f, "{}{}", LOCAL_THUMBNAIL_PREFIX, key),
            MediaRef::External(url) => f.write_str(url),
        }
    }
}

/// Generate a storage key: `<prefix>_<unix-millis>_<random>`
pub fn generate_key(kind: MediaKind) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_RANDOM_LEN)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    format!(
        "{}_{}_{}",
        kind.key_prefix(),
        chrono::Utc::now().timestamp_millis(),
        suffix
    )
}

/// Locate the local blob behind a record field pair.
/// Prefers the explicit id, falls back to parsing the reference's local
/// prefix; None means the blob is treated as already absent.
pub fn resolve_blob_key(
    kind: MediaKind,
    explicit_id: Option<&str>,
    reference: Option<&str>,
) -> Option<String> {
    if let Some(id) = explicit_id.filter(|id| !id.is_empty()) {
        return Some(id.to_string());
    }
    let parsed = MediaRef::parse(reference?);
    parsed.local_key(kind).map(str::to_string)
}
