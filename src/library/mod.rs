// Video library: upload orchestration on top of the cache and facade

pub mod cache;
pub mod facade;

#[cfg(test)]
mod tests;

use serde::Serialize;
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::constants::{DEFAULT_VIDEO_ORDER, PROGRESS_COMPLETE_PERCENT};
use crate::db::catalog::VideoRecord;
use crate::db::Store;
use crate::error::{Result, VidShelfError};
use crate::progress::{ProgressReporter, UploadProgress, UploadStage};
use crate::storage::validate::{validate_thumbnail, validate_video};
use crate::storage::{generate_key, MediaBackend, MediaFile, MediaKind, MediaPayload, MediaTargets};

pub use cache::{CatalogCache, VideoDraft, VideoPatch};
pub use facade::PersistenceFacade;

/// Everything the upload form collects
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub title: String,
    pub description: String,
    /// Defaults to 1
    pub order: Option<i64>,
    pub video: MediaFile,
    pub thumbnail: Option<MediaFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum UploadOutcome {
    Created(VideoRecord),
    /// A video with this file name is already in the library; nothing was stored
    Duplicate { file_name: String },
}

pub struct VideoLibrary {
    facade: Arc<PersistenceFacade>,
    cache: CatalogCache,
}

impl VideoLibrary {
    pub fn new(store: Store, backend: Arc<dyn MediaBackend>) -> Self {
        Self::from_facade(PersistenceFacade::new(store, backend))
    }

    pub fn from_facade(facade: PersistenceFacade) -> Self {
        let facade = Arc::new(facade);
        let cache = CatalogCache::new(facade.clone());
        Self { facade, cache }
    }

    pub fn facade(&self) -> &PersistenceFacade {
        &self.facade
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    /// Validate, store the blobs, then create the catalog entry.
    ///
    /// Validation failures are returned before anything is written. Blobs
    /// written by an upload that does not end in a new record are removed.
    pub fn upload(&self, request: UploadRequest, progress: &ProgressReporter) -> Result<UploadOutcome> {
        validate_video(&request.video)?;
        if let Some(thumbnail) = &request.thumbnail {
            validate_thumbnail(thumbnail)?;
        }

        let file_name = request.video.file_name.clone();
        if self.cache.contains_file_name(&file_name)? {
            log::warn!("A video named {} already exists; upload skipped", file_name);
            return Ok(UploadOutcome::Duplicate { file_name });
        }

        let video_key = generate_key(MediaKind::Video);
        let video_url = self.facade.store_video(&request.video, &video_key, progress)?;
        let mut written = MediaTargets {
            video_id: Some(video_key.clone()),
            video_url: Some(video_url.clone()),
            ..Default::default()
        };

        if let Some(thumbnail) = &request.thumbnail {
            let thumb_key = generate_key(MediaKind::Thumbnail);
            match self.facade.store_thumbnail(thumbnail, &thumb_key) {
                Ok(thumb_url) => {
                    progress.report(UploadProgress::new(
                        thumb_key.as_str(),
                        UploadStage::Thumbnail,
                        PROGRESS_COMPLETE_PERCENT,
                    ));
                    written.thumbnail_id = Some(thumb_key);
                    written.thumbnail_url = Some(thumb_url);
                }
                Err(e) => {
                    self.facade.discard_media(&written);
                    return Err(e);
                }
            }
        }

        let draft = VideoDraft {
            title: request.title,
            description: request.description,
            order: request.order.unwrap_or(DEFAULT_VIDEO_ORDER),
            file_name: file_name.clone(),
            url: video_url,
            has_thumbnail: written.thumbnail_url.is_some(),
            thumbnail_url: written.thumbnail_url.clone(),
            video_id: Some(video_key),
            thumbnail_id: written.thumbnail_id.clone(),
        };

        match self.cache.add(draft) {
            Ok(Some(record)) => Ok(UploadOutcome::Created(record)),
            Ok(None) => {
                self.facade.discard_media(&written);
                Ok(UploadOutcome::Duplicate { file_name })
            }
            Err(e) if e.is_constraint_violation() => {
                match self.facade.find_record_by_file_name(&file_name) {
                    Ok(Some(existing)) => log::warn!(
                        "Catalog already holds {} as video {}; upload skipped",
                        file_name,
                        existing.id
                    ),
                    _ => log::warn!("Catalog rejected {}: {}", file_name, e),
                }
                self.facade.discard_media(&written);
                Ok(UploadOutcome::Duplicate { file_name })
            }
            Err(e) => {
                self.facade.discard_media(&written);
                Err(e)
            }
        }
    }

    pub fn list(&self) -> Result<Vec<VideoRecord>> {
        self.cache.list()
    }

    /// Records whose order lies in `range`, ascending by order.
    pub fn list_order_range(&self, range: RangeInclusive<i64>) -> Result<Vec<VideoRecord>> {
        self.facade.records_in_order_range(range)
    }

    pub fn get(&self, id: i64) -> Result<Option<VideoRecord>> {
        self.cache.get_by_id(id)
    }

    pub fn edit(&self, id: i64, patch: &VideoPatch) -> Result<Option<VideoRecord>> {
        self.cache.update(id, patch)
    }

    pub fn delete(&self, id: i64) -> Result<Option<VideoRecord>> {
        self.cache.delete(id)
    }

    /// The playable video for record `id`.
    pub fn play(&self, id: i64) -> Result<MediaPayload> {
        let record = self.require(id)?;
        self.facade.fetch_video(&record.url)
    }

    /// The thumbnail for record `id`, or `None` if it has none.
    pub fn thumbnail(&self, id: i64) -> Result<Option<MediaPayload>> {
        let record = self.require(id)?;
        match &record.thumbnail_url {
            Some(reference) => self.facade.fetch_thumbnail(reference).map(Some),
            None => Ok(None),
        }
    }

    fn require(&self, id: i64) -> Result<VideoRecord> {
        self.cache
            .get_by_id(id)?
            .ok_or_else(|| VidShelfError::NotFound(format!("video {}", id)))
    }
}
