// In-memory catalog cache
//
// Mirrors the metadata catalog for the life of the process. The first call
// to any operation hydrates it from the catalog; concurrent first callers
// wait for that single load and all see its outcome. Writes go through the
// facade before (add: right after) the in-memory copy changes.

use chrono::SecondsFormat;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::db::catalog::VideoRecord;
use crate::error::{Result, VidShelfError};

use super::facade::PersistenceFacade;

/// Fields of a record before the cache assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDraft {
    pub title: String,
    pub description: String,
    pub order: i64,
    pub file_name: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub video_id: Option<String>,
    pub thumbnail_id: Option<String>,
    pub has_thumbnail: bool,
}

/// Editable fields. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
}

impl VideoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.order.is_none()
    }

    fn apply(&self, record: &mut VideoRecord) {
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
        if let Some(order) = self.order {
            record.order = order;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hydration {
    Uninitialized,
    Hydrating,
    Ready,
}

struct CacheState {
    hydration: Hydration,
    records: Vec<VideoRecord>,
    /// Incremented each time a hydration attempt starts
    attempt: u64,
    /// Outcome of the most recent failed attempt
    failure: Option<(u64, String)>,
}

pub struct CatalogCache {
    facade: Arc<PersistenceFacade>,
    state: Mutex<CacheState>,
    hydrated: Condvar,
}

pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl CatalogCache {
    pub fn new(facade: Arc<PersistenceFacade>) -> Self {
        Self {
            facade,
            state: Mutex::new(CacheState {
                hydration: Hydration::Uninitialized,
                records: Vec::new(),
                attempt: 0,
                failure: None,
            }),
            hydrated: Condvar::new(),
        }
    }

    pub fn is_hydrated(&self) -> bool {
        self.lock().hydration == Hydration::Ready
    }

    /// All records, ascending by order. Equal orders keep catalog order.
    pub fn list(&self) -> Result<Vec<VideoRecord>> {
        let state = self.ready()?;
        let mut records = state.records.clone();
        records.sort_by_key(|r| r.order);
        Ok(records)
    }

    pub fn get_by_id(&self, id: i64) -> Result<Option<VideoRecord>> {
        let state = self.ready()?;
        Ok(state.records.iter().find(|r| r.id == id).cloned())
    }

    pub fn contains_file_name(&self, file_name: &str) -> Result<bool> {
        let state = self.ready()?;
        Ok(state.records.iter().any(|r| r.file_name == file_name))
    }

    /// Create a record from `draft`. Returns `Ok(None)` without touching
    /// anything when a record with the same file name is already cached.
    pub fn add(&self, draft: VideoDraft) -> Result<Option<VideoRecord>> {
        let mut state = self.ready()?;

        if state.records.iter().any(|r| r.file_name == draft.file_name) {
            log::warn!("A video named {} already exists; upload skipped", draft.file_name);
            return Ok(None);
        }

        let id = state.records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let record = VideoRecord {
            id,
            title: draft.title,
            description: draft.description,
            order: draft.order,
            file_name: draft.file_name,
            url: draft.url,
            thumbnail_url: draft.thumbnail_url,
            video_id: draft.video_id,
            thumbnail_id: draft.thumbnail_id,
            has_thumbnail: draft.has_thumbnail,
            timestamp: now_timestamp(),
            last_updated: None,
        };

        state.records.push(record.clone());
        match self.facade.put_record(&record) {
            Ok(saved) => {
                log::info!("Added video {} ({})", saved.id, saved.file_name);
                Ok(Some(saved))
            }
            Err(e) => {
                state.records.pop();
                log::warn!("Catalog write for {} failed, cache rolled back: {}", record.file_name, e);
                Err(e)
            }
        }
    }

    /// Merge `patch` into record `id`. Returns `Ok(None)` if there is no
    /// such record.
    pub fn update(&self, id: i64, patch: &VideoPatch) -> Result<Option<VideoRecord>> {
        let mut state = self.ready()?;
        let Some(index) = state.records.iter().position(|r| r.id == id) else {
            return Ok(None);
        };

        let mut merged = state.records[index].clone();
        patch.apply(&mut merged);
        merged.last_updated = Some(now_timestamp());

        let saved = self.facade.put_record(&merged)?;
        state.records[index] = saved.clone();
        Ok(Some(saved))
    }

    /// Delete record `id` with its blobs. Returns the removed record, or
    /// `Ok(None)` if the catalog had nothing to delete. On error the cache
    /// is left as it was.
    pub fn delete(&self, id: i64) -> Result<Option<VideoRecord>> {
        let mut state = self.ready()?;

        let Some(deleted) = self.facade.delete_video_and_metadata(id)? else {
            log::info!("Delete of video {} skipped: not in the catalog", id);
            return Ok(None);
        };

        match state.records.iter().position(|r| r.id == id) {
            Some(index) => Ok(Some(state.records.remove(index))),
            None => {
                log::warn!(
                    "Deleted video {} ({}) was missing from the catalog cache",
                    id,
                    deleted.file_name
                );
                Ok(Some(deleted))
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn hydration_attempts(&self) -> u64 {
        self.lock().attempt
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the state, hydrating first if needed.
    fn ready(&self) -> Result<MutexGuard<'_, CacheState>> {
        match self.take_turn()? {
            Turn::Ready(state) => Ok(state),
            Turn::Hydrate(attempt) => {
                let loaded = self.facade.load_records();
                self.finish_hydration(attempt, loaded)
            }
        }
    }

    /// Wait out a hydration in flight, or claim the next attempt.
    fn take_turn(&self) -> Result<Turn<'_>> {
        let mut state = self.lock();
        loop {
            match state.hydration {
                Hydration::Ready => return Ok(Turn::Ready(state)),
                Hydration::Uninitialized => break,
                Hydration::Hydrating => {
                    let awaited = state.attempt;
                    while state.hydration == Hydration::Hydrating && state.attempt == awaited {
                        state = self
                            .hydrated
                            .wait(state)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                    if let Some((failed, message)) = &state.failure {
                        if *failed == awaited && state.hydration != Hydration::Ready {
                            return Err(VidShelfError::StorageFailure(format!(
                                "Catalog hydration failed: {}",
                                message
                            )));
                        }
                    }
                }
            }
        }

        state.hydration = Hydration::Hydrating;
        state.attempt += 1;
        Ok(Turn::Hydrate(state.attempt))
    }

    /// Publish the outcome of hydration `attempt` and wake every waiter.
    fn finish_hydration(
        &self,
        attempt: u64,
        loaded: Result<Vec<VideoRecord>>,
    ) -> Result<MutexGuard<'_, CacheState>> {
        let mut state = self.lock();
        match loaded {
            Ok(records) => {
                log::debug!("Catalog cache hydrated with {} records", records.len());
                state.records = records;
                state.hydration = Hydration::Ready;
                state.failure = None;
                self.hydrated.notify_all();
                Ok(state)
            }
            Err(e) => {
                log::warn!("Catalog hydration failed: {}", e);
                state.hydration = Hydration::Uninitialized;
                state.failure = Some((attempt, e.to_string()));
                self.hydrated.notify_all();
                Err(e)
            }
        }
    }
}

enum Turn<'a> {
    Ready(MutexGuard<'a, CacheState>),
    Hydrate(u64),
}
