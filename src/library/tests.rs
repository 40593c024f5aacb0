// Library scenarios: upload, duplicate suppression, delete, hydration

use super::*;
use crate::db::blobs::{self, BlobStore};
use crate::db::catalog;
use crate::progress::progress_channel;
use crate::storage::{DirectoryObjectStore, LocalBackend, ObjectStore, RemoteBackend};
use std::sync::Barrier;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const MB: usize = 1024 * 1024;

fn local_library() -> (TempDir, Store, VideoLibrary) {
    let tmp = TempDir::new().unwrap();
    let store = Store::open(tmp.path()).unwrap();
    let backend = Arc::new(LocalBackend::new(store.clone(), Duration::from_millis(5)));
    let library = VideoLibrary::new(store.clone(), backend);
    (tmp, store, library)
}

fn request(file_name: &str, size: usize) -> UploadRequest {
    UploadRequest {
        title: file_name.to_string(),
        description: "family footage".to_string(),
        order: None,
        video: MediaFile::new(file_name, "video/mp4", vec![0xAB; size]),
        thumbnail: None,
    }
}

fn created(outcome: UploadOutcome) -> VideoRecord {
    match outcome {
        UploadOutcome::Created(record) => record,
        other => panic!("expected a new record, got {:?}", other),
    }
}

fn blob_counts(store: &Store) -> (i64, i64) {
    let conn = store.connect().unwrap();
    (
        blobs::count_blobs(&conn, BlobStore::Videos).unwrap(),
        blobs::count_blobs(&conn, BlobStore::Thumbnails).unwrap(),
    )
}

#[test]
fn test_upload_without_thumbnail() {
    let (_tmp, store, library) = local_library();

    let record = created(library.upload(request("a.mp4", 10 * MB), &ProgressReporter::silent()).unwrap());

    assert_eq!(record.id, 1);
    assert_eq!(record.order, DEFAULT_VIDEO_ORDER);
    assert!(record.thumbnail_url.is_none());
    assert!(!record.has_thumbnail);
    assert!(record.url.starts_with("localblob://video_"));
    assert_eq!(record.video_id.as_deref(), record.url.strip_prefix("localblob://"));

    let listed = library.list().unwrap();
    assert_eq!(listed, vec![record]);
    assert_eq!(blob_counts(&store), (1, 0));
}

#[test]
fn test_uploaded_video_plays_back_identically() {
    let (_tmp, _store, library) = local_library();
    let bytes: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let mut req = request("clip.mp4", 0);
    req.video.bytes = bytes.clone();

    let record = created(library.upload(req, &ProgressReporter::silent()).unwrap());

    assert_eq!(
        library.play(record.id).unwrap(),
        MediaPayload::Inline { mime_type: "video/mp4".into(), bytes }
    );
}

#[test]
fn test_duplicate_upload_is_skipped() {
    let (_tmp, store, library) = local_library();
    created(library.upload(request("a.mp4", 1024), &ProgressReporter::silent()).unwrap());

    let second = library.upload(request("a.mp4", 2048), &ProgressReporter::silent()).unwrap();
    assert_eq!(second, UploadOutcome::Duplicate { file_name: "a.mp4".into() });

    let conn = store.connect().unwrap();
    assert_eq!(catalog::count_records(&conn).unwrap(), 1);
    assert_eq!(library.list().unwrap().len(), 1);
    assert_eq!(blob_counts(&store), (1, 0));
}

#[test]
fn test_oversize_thumbnail_writes_nothing() {
    let (_tmp, store, library) = local_library();
    let mut req = request("a.mp4", 1024);
    req.thumbnail = Some(MediaFile::new("big.png", "image/png", vec![0; 3 * MB]));

    let err = library.upload(req, &ProgressReporter::silent()).unwrap_err();

    assert!(matches!(err, VidShelfError::InvalidThumbnail(_)));
    assert_eq!(blob_counts(&store), (0, 0));
    assert!(library.list().unwrap().is_empty());
}

#[test]
fn test_oversize_video_writes_nothing() {
    let (_tmp, store, library) = local_library();
    let err = library
        .upload(request("huge.mp4", 50 * MB + 1), &ProgressReporter::silent())
        .unwrap_err();

    assert!(matches!(err, VidShelfError::OversizeVideo { .. }));
    assert_eq!(blob_counts(&store), (0, 0));
}

#[test]
fn test_upload_with_thumbnail() {
    let (_tmp, store, library) = local_library();
    let mut req = request("a.mp4", 1024);
    req.order = Some(4);
    req.thumbnail = Some(MediaFile::new("a.png", "image/png", vec![137, 80, 78, 71]));

    let record = created(library.upload(req, &ProgressReporter::silent()).unwrap());

    assert!(record.has_thumbnail);
    assert_eq!(record.order, 4);
    assert!(record.thumbnail_url.as_deref().unwrap().starts_with("localblob-thumb://thumb_"));
    assert_eq!(blob_counts(&store), (1, 1));
    assert_eq!(
        library.thumbnail(record.id).unwrap(),
        Some(MediaPayload::Inline { mime_type: "image/png".into(), bytes: vec![137, 80, 78, 71] })
    );
}

#[test]
fn test_upload_progress_ends_at_complete() {
    let (_tmp, _store, library) = local_library();
    let (reporter, rx) = progress_channel();
    let mut req = request("a.mp4", 4096);
    req.thumbnail = Some(MediaFile::new("a.jpg", "image/jpeg", vec![1, 2]));

    library.upload(req, &reporter).unwrap();
    drop(reporter);

    let events: Vec<UploadProgress> = rx.iter().collect();
    let video: Vec<u8> = events
        .iter()
        .filter(|e| e.stage == UploadStage::Video)
        .map(|e| e.percent)
        .collect();
    assert_eq!(video.last(), Some(&100));
    assert!(video.windows(2).all(|w| w[0] < w[1]));
    assert!(events.iter().any(|e| e.stage == UploadStage::Thumbnail && e.is_complete()));
}

#[test]
fn test_delete_with_malformed_thumbnail_reference() {
    let (_tmp, store, library) = local_library();
    let record = created(library.upload(request("a.mp4", 1024), &ProgressReporter::silent()).unwrap());

    // Point the record at a thumbnail whose key cannot be derived
    let conn = store.connect().unwrap();
    let mut broken = record.clone();
    broken.thumbnail_url = Some("localblob-thumb:/thumb_broken".into());
    broken.has_thumbnail = true;
    catalog::put_record(&conn, &broken).unwrap();

    let removed = library.delete(record.id).unwrap();

    assert_eq!(removed.map(|r| r.id), Some(record.id));
    assert_eq!(blob_counts(&store), (0, 0));
    assert!(catalog::get_record(&conn, record.id).unwrap().is_none());
    assert!(library.get(record.id).unwrap().is_none());
}

#[test]
fn test_play_unknown_id_is_not_found() {
    let (_tmp, _store, library) = local_library();
    assert!(matches!(library.play(5).unwrap_err(), VidShelfError::NotFound(_)));
    assert!(matches!(library.thumbnail(5).unwrap_err(), VidShelfError::NotFound(_)));
}

#[test]
fn test_play_missing_blob_is_not_found() {
    let (_tmp, store, library) = local_library();
    let record = created(library.upload(request("a.mp4", 16), &ProgressReporter::silent()).unwrap());
    let conn = store.connect().unwrap();
    blobs::delete_blob(&conn, BlobStore::Videos, record.video_id.as_deref().unwrap()).unwrap();

    assert!(matches!(library.play(record.id).unwrap_err(), VidShelfError::NotFound(_)));
}

#[test]
fn test_edit_through_library() {
    let (_tmp, _store, library) = local_library();
    let record = created(library.upload(request("a.mp4", 16), &ProgressReporter::silent()).unwrap());

    let patch = VideoPatch {
        description: Some("birthday".into()),
        order: Some(3),
        ..Default::default()
    };
    let edited = library.edit(record.id, &patch).unwrap().unwrap();

    assert_eq!(edited.title, record.title);
    assert_eq!(edited.description, "birthday");
    assert_eq!(edited.order, 3);
    assert_eq!(edited.url, record.url);
    assert!(library.edit(999, &patch).unwrap().is_none());
}

#[test]
fn test_catalog_duplicate_rolls_back_blobs() {
    let (_tmp, store, library) = local_library();
    // Hydrate, then let another writer claim the file name behind the cache's back
    assert!(library.list().unwrap().is_empty());
    let conn = store.connect().unwrap();
    catalog::put_record(
        &conn,
        &VideoRecord {
            id: 50,
            title: "other".into(),
            description: String::new(),
            order: 1,
            file_name: "a.mp4".into(),
            url: "https://example.com/a.mp4".into(),
            thumbnail_url: None,
            video_id: None,
            thumbnail_id: None,
            has_thumbnail: false,
            timestamp: cache::now_timestamp(),
            last_updated: None,
        },
    )
    .unwrap();

    let err = library
        .cache()
        .add(VideoDraft {
            title: "a".into(),
            description: String::new(),
            order: 1,
            file_name: "a.mp4".into(),
            url: "localblob://video_x".into(),
            thumbnail_url: None,
            video_id: None,
            thumbnail_id: None,
            has_thumbnail: false,
        })
        .unwrap_err();
    assert!(err.is_constraint_violation());
    assert!(library.list().unwrap().is_empty());

    let outcome = library.upload(request("a.mp4", 64), &ProgressReporter::silent()).unwrap();
    assert_eq!(outcome, UploadOutcome::Duplicate { file_name: "a.mp4".into() });
    assert_eq!(blob_counts(&store), (0, 0));
}

#[test]
fn test_catalog_failure_rolls_back_cache_and_blobs() {
    let (_tmp, store, library) = local_library();
    assert!(library.list().unwrap().is_empty());

    let conn = store.connect().unwrap();
    conn.execute_batch("ALTER TABLE metadata RENAME TO metadata_offline;").unwrap();

    let err = library.upload(request("a.mp4", 64), &ProgressReporter::silent()).unwrap_err();
    assert!(err.is_storage_failure(), "got {:?}", err);
    assert!(library.list().unwrap().is_empty());
    assert_eq!(blob_counts(&store), (0, 0));
}

#[test]
fn test_failed_hydration_is_retried() {
    let (_tmp, store, library) = local_library();
    let conn = store.connect().unwrap();
    conn.execute_batch("ALTER TABLE metadata RENAME TO metadata_offline;").unwrap();

    assert!(library.list().unwrap_err().is_storage_failure());
    assert!(!library.cache().is_hydrated());

    conn.execute_batch("ALTER TABLE metadata_offline RENAME TO metadata;").unwrap();
    assert!(library.list().unwrap().is_empty());
    assert!(library.cache().is_hydrated());
    assert_eq!(library.cache().hydration_attempts(), 2);
}

#[test]
fn test_concurrent_first_calls_hydrate_once() {
    let (_tmp, store, library) = local_library();
    {
        let seed = VideoLibrary::new(
            store.clone(),
            Arc::new(LocalBackend::new(store.clone(), Duration::from_millis(5))),
        );
        for name in ["a.mp4", "b.mp4", "c.mp4"] {
            created(seed.upload(request(name, 8), &ProgressReporter::silent()).unwrap());
        }
    }

    let library = Arc::new(library);
    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let library = library.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                library.list().unwrap().len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 3);
    }
    assert_eq!(library.cache().hydration_attempts(), 1);
}

struct BrokenDeletes;

impl ObjectStore for BrokenDeletes {
    fn store(&self, _bytes: &[u8], path: &str, progress: &dyn Fn(u8)) -> Result<String> {
        progress(100);
        Ok(format!("https://bucket.example.com/{}", path))
    }

    fn delete(&self, url: &str) -> Result<()> {
        Err(VidShelfError::StorageFailure(format!("bucket refused delete of {}", url)))
    }
}

#[test]
fn test_remote_delete_failure_keeps_record() {
    let tmp = TempDir::new().unwrap();
    let store = Store::open(tmp.path()).unwrap();
    let library = VideoLibrary::new(store.clone(), Arc::new(RemoteBackend::new(Arc::new(BrokenDeletes))));

    let record = created(library.upload(request("a.mp4", 32), &ProgressReporter::silent()).unwrap());
    assert!(record.url.starts_with("https://bucket.example.com/videos/video_"));
    assert_eq!(
        library.play(record.id).unwrap(),
        MediaPayload::External(record.url.clone())
    );

    let err = library.delete(record.id).unwrap_err();
    assert!(err.is_storage_failure());
    assert_eq!(library.get(record.id).unwrap(), Some(record.clone()));
    let conn = store.connect().unwrap();
    assert!(catalog::get_record(&conn, record.id).unwrap().is_some());
}

#[test]
fn test_local_upload_deleted_after_switch_to_remote() {
    let (tmp, store, library) = local_library();
    let record = created(library.upload(request("a.mp4", 64), &ProgressReporter::silent()).unwrap());
    assert_eq!(blob_counts(&store), (1, 0));
    drop(library);

    let objects = Arc::new(DirectoryObjectStore::new(&tmp.path().join("bucket")).unwrap());
    let reopened = VideoLibrary::new(store.clone(), Arc::new(RemoteBackend::new(objects)));
    assert_eq!(reopened.facade().backend_name(), "remote");
    assert!(matches!(reopened.play(record.id).unwrap(), MediaPayload::Inline { .. }));

    assert_eq!(reopened.delete(record.id).unwrap().map(|r| r.id), Some(record.id));
    assert_eq!(blob_counts(&store), (0, 0));
    assert!(reopened.list().unwrap().is_empty());
}

#[test]
fn test_order_range_reads_catalog_index() {
    let (_tmp, _store, library) = local_library();
    for (name, order) in [("a.mp4", 5), ("b.mp4", 1), ("c.mp4", 3), ("d.mp4", 3)] {
        let mut req = request(name, 8);
        req.order = Some(order);
        created(library.upload(req, &ProgressReporter::silent()).unwrap());
    }

    let names: Vec<String> = library
        .list_order_range(2..=4)
        .unwrap()
        .into_iter()
        .map(|r| r.file_name)
        .collect();
    assert_eq!(names, vec!["c.mp4", "d.mp4"]);
}
