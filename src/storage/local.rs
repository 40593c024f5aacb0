// Local blob backend: media lives in the library database as data URLs.

use std::time::Duration;

use crate::db::blobs;
use crate::db::Store;
use crate::error::{Result, VidShelfError};
use crate::progress::{ProgressReporter, SyntheticProgress, UploadStage};

use super::encoding::{decode_data_url, encode_data_url};
use super::reference::{resolve_blob_key, MediaKind, MediaRef};
use super::validate::validate_thumbnail;
use super::{BlobRemoval, MediaBackend, MediaFile, MediaPayload, MediaTargets};

pub struct LocalBackend {
    store: Store,
    progress_interval: Duration,
}

impl LocalBackend {
    pub fn new(store: Store, progress_interval: Duration) -> Self {
        Self {
            store,
            progress_interval,
        }
    }

    fn write(&self, kind: MediaKind, key: &str, file: &MediaFile) -> Result<String> {
        let encoded = encode_data_url(&file.mime_type, &file.bytes);
        let conn = self.store.connect()?;
        blobs::put_blob(&conn, kind.blob_store(), key, &encoded)?;
        log::debug!("Stored {} ({} bytes) in {}", key, file.size(), kind.blob_store());
        Ok(MediaRef::local(kind, key).to_string())
    }

    fn read(&self, kind: MediaKind, key: &str) -> Result<MediaPayload> {
        let conn = self.store.connect()?;
        let encoded = blobs::get_blob(&conn, kind.blob_store(), key)?
            .ok_or_else(|| VidShelfError::NotFound(format!("{} blob {}", kind.blob_store(), key)))?;
        let decoded = decode_data_url(&encoded)?;
        Ok(MediaPayload::Inline {
            mime_type: decoded.mime_type,
            bytes: decoded.bytes,
        })
    }
}

impl MediaBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn stores_externally(&self) -> bool {
        false
    }

    fn store_video(&self, file: &MediaFile, key: &str, progress: &ProgressReporter) -> Result<String> {
        let ticker = SyntheticProgress::start(progress, key, UploadStage::Video, self.progress_interval);
        match self.write(MediaKind::Video, key, file) {
            Ok(reference) => {
                ticker.finish();
                Ok(reference)
            }
            Err(e) => {
                ticker.abort();
                Err(e)
            }
        }
    }

    fn store_thumbnail(&self, file: &MediaFile, key: &str) -> Result<String> {
        validate_thumbnail(file)?;
        self.write(MediaKind::Thumbnail, key, file)
    }

    fn fetch_video(&self, reference: &str) -> Result<MediaPayload> {
        match MediaRef::parse(reference) {
            MediaRef::LocalVideo(key) => self.read(MediaKind::Video, &key),
            _ => Err(VidShelfError::NotFound(format!(
                "{} is not a local video reference",
                reference
            ))),
        }
    }

    fn fetch_thumbnail(&self, reference: &str) -> Result<MediaPayload> {
        match MediaRef::parse(reference) {
            MediaRef::LocalThumbnail(key) => self.read(MediaKind::Thumbnail, &key),
            MediaRef::External(url) => Ok(MediaPayload::External(url)),
            MediaRef::LocalVideo(_) => Err(VidShelfError::NotFound(format!(
                "{} is not a thumbnail reference",
                reference
            ))),
        }
    }

    fn delete_media(&self, targets: &MediaTargets) -> Result<BlobRemoval> {
        let conn = self.store.connect()?;
        let mut removal = BlobRemoval::default();

        let video_key = resolve_blob_key(
            MediaKind::Video,
            targets.video_id.as_deref(),
            targets.video_url.as_deref(),
        );
        match video_key {
            Some(key) => {
                removal.video_removed = blobs::delete_blob(&conn, blobs::BlobStore::Videos, &key)?;
                if removal.video_removed {
                    log::info!("Deleted video blob {}", key);
                }
            }
            None if targets.video_url.is_some() => log::warn!(
                "No video storage key for {:?}; skipping blob delete",
                targets.video_url
            ),
            None => {}
        }

        let thumbnail_key = resolve_blob_key(
            MediaKind::Thumbnail,
            targets.thumbnail_id.as_deref(),
            targets.thumbnail_url.as_deref(),
        );
        match thumbnail_key {
            Some(key) => {
                removal.thumbnail_removed =
                    blobs::delete_blob(&conn, blobs::BlobStore::Thumbnails, &key)?;
                if removal.thumbnail_removed {
                    log::info!("Deleted thumbnail blob {}", key);
                }
            }
            None if targets.thumbnail_url.is_some() => log::warn!(
                "No thumbnail storage key for {:?}; skipping blob delete",
                targets.thumbnail_url
            ),
            None => {}
        }

        Ok(removal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::progress_channel;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Store, LocalBackend) {
        let tmp = TempDir::new().unwrap();
        let store = Store::open(tmp.path()).unwrap();
        let backend = LocalBackend::new(store.clone(), Duration::from_secs(3600));
        (tmp, store, backend)
    }

    #[test]
    fn test_video_roundtrip_fidelity() {
        let (_tmp, _store, backend) = setup();
        let bytes: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let file = MediaFile::new("a.mp4", "video/mp4", bytes.clone());

        let reference = backend
            .store_video(&file, "video_1_abcdefghi", &ProgressReporter::silent())
            .unwrap();
        assert_eq!(reference, "localblob://video_1_abcdefghi");

        let payload = backend.fetch_video(&reference).unwrap();
        assert_eq!(
            payload,
            MediaPayload::Inline { mime_type: "video/mp4".to_string(), bytes }
        );
    }

    #[test]
    fn test_store_video_reports_completion() {
        let (_tmp, _store, backend) = setup();
        let (reporter, rx) = progress_channel();
        backend
            .store_video(&MediaFile::new("a.mp4", "video/mp4", vec![1, 2, 3]), "video_k", &reporter)
            .unwrap();

        let last = rx.try_iter().last().unwrap();
        assert_eq!(last.percent, 100);
        assert_eq!(last.key, "video_k");
    }

    #[test]
    fn test_fetch_missing_or_foreign_video_is_not_found() {
        let (_tmp, _store, backend) = setup();
        let missing = backend.fetch_video("localblob://video_nope").unwrap_err();
        assert!(matches!(missing, VidShelfError::NotFound(_)));

        let foreign = backend.fetch_video("https://example.com/v.mp4").unwrap_err();
        assert!(matches!(foreign, VidShelfError::NotFound(_)));
    }

    #[test]
    fn test_thumbnail_store_and_external_passthrough() {
        let (_tmp, _store, backend) = setup();
        let thumb = MediaFile::new("t.png", "image/png", vec![137, 80, 78, 71]);
        let reference = backend.store_thumbnail(&thumb, "thumb_1_abc").unwrap();
        assert_eq!(reference, "localblob-thumb://thumb_1_abc");
        assert!(matches!(
            backend.fetch_thumbnail(&reference).unwrap(),
            MediaPayload::Inline { ref mime_type, .. } if mime_type == "image/png"
        ));

        assert_eq!(
            backend.fetch_thumbnail("https://cdn.example.com/t.png").unwrap(),
            MediaPayload::External("https://cdn.example.com/t.png".to_string())
        );
    }

    #[test]
    fn test_invalid_thumbnail_writes_nothing() {
        let (_tmp, store, backend) = setup();
        let err = backend
            .store_thumbnail(&MediaFile::new("t.txt", "text/plain", vec![1]), "thumb_x")
            .unwrap_err();
        assert!(matches!(err, VidShelfError::InvalidThumbnail(_)));

        let conn = store.connect().unwrap();
        assert_eq!(blobs::count_blobs(&conn, blobs::BlobStore::Thumbnails).unwrap(), 0);
    }

    #[test]
    fn test_delete_media_uses_key_derivation_policy() {
        let (_tmp, store, backend) = setup();
        let conn = store.connect().unwrap();
        blobs::put_blob(&conn, blobs::BlobStore::Videos, "video_a", "data:video/mp4;base64,AA==").unwrap();
        blobs::put_blob(&conn, blobs::BlobStore::Thumbnails, "thumb_a", "data:image/png;base64,AA==").unwrap();

        // No explicit ids: keys come from the references
        let removal = backend
            .delete_media(&MediaTargets {
                video_id: None,
                video_url: Some("localblob://video_a".into()),
                thumbnail_id: None,
                thumbnail_url: Some("localblob-thumb://thumb_a".into()),
            })
            .unwrap();
        assert_eq!(removal, BlobRemoval { video_removed: true, thumbnail_removed: true });
        assert_eq!(blobs::count_blobs(&conn, blobs::BlobStore::Videos).unwrap(), 0);
        assert_eq!(blobs::count_blobs(&conn, blobs::BlobStore::Thumbnails).unwrap(), 0);
    }

    #[test]
    fn test_delete_media_skips_unresolvable_thumbnail() {
        let (_tmp, store, backend) = setup();
        let conn = store.connect().unwrap();
        blobs::put_blob(&conn, blobs::BlobStore::Videos, "video_b", "data:video/mp4;base64,AA==").unwrap();

        let removal = backend
            .delete_media(&MediaTargets {
                video_id: Some("video_b".into()),
                video_url: Some("localblob://video_b".into()),
                thumbnail_id: None,
                thumbnail_url: Some("localblob-thumb:/broken".into()),
            })
            .unwrap();
        assert!(removal.video_removed);
        assert!(!removal.thumbnail_removed);
    }
}
