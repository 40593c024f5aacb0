// Remote object storage backend
//
// The object store itself is an external collaborator: it stores bytes under
// a path (videos/<key>, thumbnails/<key>) and hands back a URL, and deletes by
// URL. Catalog records keep that URL verbatim.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::constants::{PROGRESS_COMPLETE_PERCENT, REMOTE_WRITE_CHUNK_SIZE};
use crate::error::{Result, VidShelfError};
use crate::progress::{ProgressReporter, UploadProgress, UploadStage};

use super::reference::{MediaKind, MediaRef};
use super::validate::validate_thumbnail;
use super::{BlobRemoval, MediaBackend, MediaFile, MediaPayload, MediaTargets};

/// External object storage
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` at `path`, calling `progress` with transfer percentages.
    /// Returns the URL of the stored object.
    fn store(&self, bytes: &[u8], path: &str, progress: &dyn Fn(u8)) -> Result<String>;

    fn delete(&self, url: &str) -> Result<()>;
}

pub struct RemoteBackend {
    objects: Arc<dyn ObjectStore>,
}

impl RemoteBackend {
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }

    fn object_path(kind: MediaKind, key: &str) -> String {
        format!("{}/{}", kind.remote_dir(), key)
    }

    fn delete_external(&self, kind: MediaKind, reference: Option<&str>) -> Result<bool> {
        let Some(reference) = reference else {
            return Ok(false);
        };
        match MediaRef::parse(reference) {
            MediaRef::External(url) => {
                self.objects.delete(&url)?;
                log::info!("Deleted remote {:?} object {}", kind, url);
                Ok(true)
            }
            other => {
                log::debug!("{} is not a remote object; skipping", other);
                Ok(false)
            }
        }
    }
}

impl MediaBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn stores_externally(&self) -> bool {
        true
    }

    fn store_video(&self, file: &MediaFile, key: &str, progress: &ProgressReporter) -> Result<String> {
        let path = Self::object_path(MediaKind::Video, key);
        self.objects.store(&file.bytes, &path, &|percent| {
            progress.report(UploadProgress::new(key, UploadStage::Video, percent))
        })
    }

    fn store_thumbnail(&self, file: &MediaFile, key: &str) -> Result<String> {
        validate_thumbnail(file)?;
        let path = Self::object_path(MediaKind::Thumbnail, key);
        self.objects.store(&file.bytes, &path, &|_| {})
    }

    fn fetch_video(&self, reference: &str) -> Result<MediaPayload> {
        match MediaRef::parse(reference) {
            MediaRef::External(url) => Ok(MediaPayload::External(url)),
            _ => Err(VidShelfError::NotFound(format!(
                "{} is stored locally, not in the remote store",
                reference
            ))),
        }
    }

    fn fetch_thumbnail(&self, reference: &str) -> Result<MediaPayload> {
        match MediaRef::parse(reference) {
            MediaRef::External(url) => Ok(MediaPayload::External(url)),
            _ => Err(VidShelfError::NotFound(format!(
                "{} is stored locally, not in the remote store",
                reference
            ))),
        }
    }

    fn delete_media(&self, targets: &MediaTargets) -> Result<BlobRemoval> {
        Ok(BlobRemoval {
            video_removed: self.delete_external(MediaKind::Video, targets.video_url.as_deref())?,
            thumbnail_removed: self
                .delete_external(MediaKind::Thumbnail, targets.thumbnail_url.as_deref())?,
        })
    }
}

const FILE_URL_SCHEME: &str = "file://";

/// Object store over a local directory tree, addressed with file:// URLs.
/// Stands in for a hosted bucket (a mounted share, a sync folder, tests).
pub struct DirectoryObjectStore {
    root: PathBuf,
}

impl DirectoryObjectStore {
    pub fn new(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object path below the root, rejecting traversal.
    fn resolve(&self, object_path: &str) -> Result<PathBuf> {
        let relative = Path::new(object_path);
        if object_path.is_empty()
            || !relative.components().all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(VidShelfError::StorageFailure(format!(
                "Invalid object path: {}",
                object_path
            )));
        }
        Ok(self.root.join(relative))
    }

    fn path_from_url(&self, url: &str) -> Result<PathBuf> {
        let path = url
            .strip_prefix(FILE_URL_SCHEME)
            .map(PathBuf::from)
            .ok_or_else(|| VidShelfError::StorageFailure(format!("Not a file:// URL: {}", url)))?;

        let escapes = path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::CurDir));
        if escapes || !path.starts_with(&self.root) {
            return Err(VidShelfError::StorageFailure(format!(
                "URL is outside the object store: {}",
                url
            )));
        }
        Ok(path)
    }
}

impl ObjectStore for DirectoryObjectStore {
    fn store(&self, bytes: &[u8], path: &str, progress: &dyn Fn(u8)) -> Result<String> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(&target)?;
        let total = bytes.len();
        let mut written = 0usize;
        for chunk in bytes.chunks(REMOTE_WRITE_CHUNK_SIZE) {
            file.write_all(chunk)?;
            written += chunk.len();
            progress((written as u64 * 100 / total as u64) as u8);
        }
        file.sync_all()?;
        if total == 0 {
            progress(PROGRESS_COMPLETE_PERCENT);
        }

        Ok(format!("{}{}", FILE_URL_SCHEME, target.display()))
    }

    fn delete(&self, url: &str) -> Result<()> {
        let path = self.path_from_url(url)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
