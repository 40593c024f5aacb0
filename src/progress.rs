// Upload progress events and the synthetic progress ticker
//
// Local writes finish long before a UI would notice, so local uploads report
// progress on a fixed cadence (10% steps up to 90%, then 100% on completion)
// instead of measuring I/O. Remote uploads report real transfer progress
// through the same channel.

use serde::Serialize;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::constants::{PROGRESS_CEILING_PERCENT, PROGRESS_COMPLETE_PERCENT, PROGRESS_STEP_PERCENT};

/// Which blob of an upload the event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStage {
    Video,
    Thumbnail,
}

/// Progress payload emitted while a blob is being stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub key: String,
    pub stage: UploadStage,
    pub percent: u8,
}

impl UploadProgress {
    pub fn new(key: impl Into<String>, stage: UploadStage, percent: u8) -> Self {
        Self {
            key: key.into(),
            stage,
            percent: percent.min(PROGRESS_COMPLETE_PERCENT),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.percent >= PROGRESS_COMPLETE_PERCENT
    }
}

/// Sending half of a progress channel. Reporting never fails: a missing or
/// dropped receiver just means nobody is listening.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<Sender<UploadProgress>>,
}

impl ProgressReporter {
    pub fn new(sender: Sender<UploadProgress>) -> Self {
        Self { sender: Some(sender) }
    }

    /// A reporter that discards every event.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn report(&self, progress: UploadProgress) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(progress);
        }
    }
}

/// Create a progress channel. Subscribers read events from the receiver.
pub fn progress_channel() -> (ProgressReporter, Receiver<UploadProgress>) {
    let (tx, rx) = mpsc::channel();
    (ProgressReporter::new(tx), rx)
}

/// Fixed-cadence progress ticker for a single blob write.
pub struct SyntheticProgress {
    reporter: ProgressReporter,
    key: String,
    stage: UploadStage,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SyntheticProgress {
    /// Start ticking. Emits one step per `interval` until the ceiling is
    /// reached or the ticker is stopped.
    pub fn start(reporter: &ProgressReporter, key: &str, stage: UploadStage, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let ticker = reporter.clone();
        let ticker_key = key.to_string();

        let spawned = std::thread::Builder::new()
            .name("upload-progress".into())
            .spawn(move || {
                let mut percent = 0u8;
                while percent < PROGRESS_CEILING_PERCENT {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            percent += PROGRESS_STEP_PERCENT;
                            ticker.report(UploadProgress::new(ticker_key.as_str(), stage, percent));
                        }
                        // Stopped, or the owner went away
                        _ => return,
                    }
                }
            });

        let handle = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("Could not start progress ticker for {}: {}", key, e);
                None
            }
        };

        Self {
            reporter: reporter.clone(),
            key: key.to_string(),
            stage,
            stop: Some(stop_tx),
            handle,
        }
    }

    /// Stop ticking and report completion.
    pub fn finish(mut self) {
        self.halt();
        self.reporter
            .report(UploadProgress::new(self.key.as_str(), self.stage, PROGRESS_COMPLETE_PERCENT));
    }

    /// Stop ticking without reporting completion (the write failed).
    pub fn abort(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SyntheticProgress {
    fn drop(&mut self) {
        self.halt();
    }
}
