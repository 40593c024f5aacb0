// Storage capability interface
//
// Media bytes live either in the library's own blob tables (LocalBackend) or
// in an external object store (RemoteBackend). The rest of the crate only
// sees MediaBackend; which one is used is a configuration choice.

pub mod encoding;
pub mod local;
pub mod reference;
pub mod remote;
pub mod validate;

use std::path::Path;

use crate::db::catalog::VideoRecord;
use crate::error::Result;
use crate::progress::ProgressReporter;

pub use local::LocalBackend;
pub use reference::{generate_key, resolve_blob_key, MediaKind, MediaRef};
pub use remote::{DirectoryObjectStore, ObjectStore, RemoteBackend};

/// A file handed in for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let mime_type = mime_guess::from_path(path).first_or_octet_stream().to_string();
        Ok(Self::new(file_name, mime_type, bytes))
    }

    /// Read a video from disk, refusing oversize files before loading them.
    pub fn read_video(path: &Path) -> Result<Self> {
        validate::validate_video_size(std::fs::metadata(path)?.len())?;
        Self::from_path(path)
    }

    /// Read a thumbnail from disk, refusing oversize files before loading them.
    pub fn read_thumbnail(path: &Path) -> Result<Self> {
        validate::validate_thumbnail_size(std::fs::metadata(path)?.len())?;
        Self::from_path(path)
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// What a fetch hands back for display or playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPayload {
    /// Bytes decoded from the local blob store
    Inline { mime_type: String, bytes: Vec<u8> },
    /// An external URL, passed through without lookup
    External(String),
}

/// The blob-locating fields of a record (or of an upload in flight)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaTargets {
    pub video_id: Option<String>,
    pub video_url: Option<String>,
    pub thumbnail_id: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl From<&VideoRecord> for MediaTargets {
    fn from(record: &VideoRecord) -> Self {
        Self {
            video_id: record.video_id.clone(),
            video_url: Some(record.url.clone()),
            thumbnail_id: record.thumbnail_id.clone(),
            thumbnail_url: record.thumbnail_url.clone(),
        }
    }
}

impl MediaTargets {
    pub fn is_empty(&self) -> bool {
        self.video_id.is_none()
            && self.video_url.is_none()
            && self.thumbnail_id.is_none()
            && self.thumbnail_url.is_none()
    }

    /// Split into (external, local) by reference form. A field pair with no
    /// reference stays local so an explicit id still resolves.
    pub fn split_external(&self) -> (MediaTargets, MediaTargets) {
        let is_external = |reference: &Option<String>| {
            reference
                .as_deref()
                .is_some_and(|r| matches!(MediaRef::parse(r), MediaRef::External(_)))
        };

        let mut external = MediaTargets::default();
        let mut local = MediaTargets::default();

        let side = if is_external(&self.video_url) { &mut external } else { &mut local };
        side.video_id = self.video_id.clone();
        side.video_url = self.video_url.clone();

        let side = if is_external(&self.thumbnail_url) { &mut external } else { &mut local };
        side.thumbnail_id = self.thumbnail_id.clone();
        side.thumbnail_url = self.thumbnail_url.clone();

        (external, local)
    }

    /// External references among the targets
    pub fn external_urls(&self) -> Vec<&str> {
        [self.video_url.as_deref(), self.thumbnail_url.as_deref()]
            .into_iter()
            .flatten()
            .filter(|r| matches!(MediaRef::parse(r), MediaRef::External(_)))
            .collect()
    }
}

/// Which blobs a delete actually resolved and removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlobRemoval {
    pub video_removed: bool,
    pub thumbnail_removed: bool,
}

impl BlobRemoval {
    pub fn merge(self, other: BlobRemoval) -> Self {
        Self {
            video_removed: self.video_removed || other.video_removed,
            thumbnail_removed: self.thumbnail_removed || other.thumbnail_removed,
        }
    }
}

pub trait MediaBackend: Send + Sync {
    /// Short name for logs and `vidshelf show`
    fn name(&self) -> &'static str;

    /// True when the references this backend hands out are external URLs
    /// rather than `localblob://` forms.
    fn stores_externally(&self) -> bool;

    /// Store video bytes under `key`, reporting progress. Returns the reference
    /// to persist in the catalog. Size is validated by the caller.
    fn store_video(&self, file: &MediaFile, key: &str, progress: &ProgressReporter) -> Result<String>;

    /// Validate and store a thumbnail under `key`. Returns its reference.
    fn store_thumbnail(&self, file: &MediaFile, key: &str) -> Result<String>;

    fn fetch_video(&self, reference: &str) -> Result<MediaPayload>;

    fn fetch_thumbnail(&self, reference: &str) -> Result<MediaPayload>;

    /// Remove whichever blobs the targets resolve to. Unresolvable or
    /// already-missing blobs are skipped, not errors.
    fn delete_media(&self, targets: &MediaTargets) -> Result<BlobRemoval>;
}
