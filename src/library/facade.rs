// Persistence facade
//
// Ties the metadata catalog to whichever MediaBackend holds the bytes.
// Upload orchestration and the cache go through here; nothing above this
// layer touches blob tables or object stores directly.
//
// Writes go to the configured backend. Reads and deletes are routed by the
// form of the stored reference, so records written under another backend
// stay playable and deletable after the configuration changes.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::DEFAULT_PROGRESS_INTERVAL_MS;
use crate::db::catalog::{self, VideoRecord};
use crate::db::Store;
use crate::error::Result;
use crate::progress::ProgressReporter;
use crate::storage::{
    BlobRemoval, LocalBackend, MediaBackend, MediaFile, MediaPayload, MediaRef, MediaTargets,
};

pub struct PersistenceFacade {
    store: Store,
    backend: Arc<dyn MediaBackend>,
    /// Blob tables of this library, whatever the configured backend
    local: LocalBackend,
    /// Object store for external references, if one is known
    remote: Option<Arc<dyn MediaBackend>>,
}

impl PersistenceFacade {
    pub fn new(store: Store, backend: Arc<dyn MediaBackend>) -> Self {
        let local = LocalBackend::new(
            store.clone(),
            Duration::from_millis(DEFAULT_PROGRESS_INTERVAL_MS),
        );
        let remote = backend.stores_externally().then(|| backend.clone());
        Self {
            store,
            backend,
            local,
            remote,
        }
    }

    /// Reach external references through `remote` when the configured
    /// backend keeps media locally.
    pub fn with_remote(mut self, remote: Arc<dyn MediaBackend>) -> Self {
        if self.remote.is_none() {
            self.remote = Some(remote);
        }
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Write video bytes under `key`. Size is checked by the upload flow
    /// before this is called.
    pub fn store_video(&self, file: &MediaFile, key: &str, progress: &ProgressReporter) -> Result<String> {
        self.backend.store_video(file, key, progress)
    }

    pub fn store_thumbnail(&self, file: &MediaFile, key: &str) -> Result<String> {
        self.backend.store_thumbnail(file, key)
    }

    pub fn fetch_video(&self, reference: &str) -> Result<MediaPayload> {
        self.reader_for(reference).fetch_video(reference)
    }

    pub fn fetch_thumbnail(&self, reference: &str) -> Result<MediaPayload> {
        self.reader_for(reference).fetch_thumbnail(reference)
    }

    fn reader_for(&self, reference: &str) -> &dyn MediaBackend {
        match (MediaRef::parse(reference), &self.remote) {
            (MediaRef::External(_), Some(remote)) => remote.as_ref(),
            _ => &self.local,
        }
    }

    /// Remove a record's blobs, then the record itself.
    ///
    /// Returns the removed record, or `Ok(None)` when there is no record for
    /// `id`. Blobs whose key cannot be derived are skipped and the record is
    /// still removed. If a backend fails outright the record is kept and the
    /// error returned.
    pub fn delete_video_and_metadata(&self, id: i64) -> Result<Option<VideoRecord>> {
        let conn = self.store.connect()?;
        let record = match catalog::get_record(&conn, id)? {
            Some(record) => record,
            None => {
                log::info!("No metadata for video {}; nothing to delete", id);
                return Ok(None);
            }
        };

        let removal = self.delete_media(&MediaTargets::from(&record))?;
        if !removal.video_removed {
            log::warn!("Video blob for record {} ({}) was not removed", id, record.url);
        }

        catalog::delete_record(&conn, id)?;
        log::info!("Deleted video {} ({})", id, record.file_name);
        Ok(Some(record))
    }

    /// Best-effort removal of blobs written by an upload that did not make
    /// it into the catalog. Failures are logged, never returned.
    pub fn discard_media(&self, targets: &MediaTargets) {
        match self.delete_media(targets) {
            Ok(_) => log::info!("Rolled back upload blobs {:?} / {:?}", targets.video_id, targets.thumbnail_id),
            Err(e) => log::warn!(
                "Could not roll back upload blobs {:?} / {:?}: {}",
                targets.video_id,
                targets.thumbnail_id,
                e
            ),
        }
    }

    /// External objects go first: if the object store refuses, nothing
    /// local has been touched yet.
    fn delete_media(&self, targets: &MediaTargets) -> Result<BlobRemoval> {
        let Some(remote) = &self.remote else {
            for url in targets.external_urls() {
                log::warn!("No object store configured for {}; leaving it in place", url);
            }
            return self.local.delete_media(targets);
        };

        let (external, local) = targets.split_external();
        let mut removal = BlobRemoval::default();
        if !external.is_empty() {
            removal = removal.merge(remote.delete_media(&external)?);
        }
        if !local.is_empty() {
            removal = removal.merge(self.local.delete_media(&local)?);
        }
        Ok(removal)
    }

    pub fn load_records(&self) -> Result<Vec<VideoRecord>> {
        let conn = self.store.connect()?;
        catalog::get_all_records(&conn)
    }

    pub fn get_record(&self, id: i64) -> Result<Option<VideoRecord>> {
        let conn = self.store.connect()?;
        catalog::get_record(&conn, id)
    }

    pub fn find_record_by_file_name(&self, file_name: &str) -> Result<Option<VideoRecord>> {
        let conn = self.store.connect()?;
        catalog::find_record_by_file_name(&conn, file_name)
    }

    /// Records with order in `range`, read straight from the catalog index.
    pub fn records_in_order_range(&self, range: RangeInclusive<i64>) -> Result<Vec<VideoRecord>> {
        let conn = self.store.connect()?;
        catalog::list_records_by_order(&conn, range)
    }

    pub fn put_record(&self, record: &VideoRecord) -> Result<VideoRecord> {
        let conn = self.store.connect()?;
        catalog::put_record(&conn, record)
    }
}
