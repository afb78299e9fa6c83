//! # Upload Coordinator
//!
//! Uploads every volume's archive to object storage in parallel. Each upload
//! runs as its own task inside a [`JoinSet`] and reports back over a channel;
//! the coordinator itself never touches the handle map, workers only receive
//! the path they upload.
//!
//! The first failure wins: it is returned immediately and every surviving
//! worker is aborted. Cancellation aborts the same way.

use crate::constants::components;
use crate::error::{MigrationError, Result};
use crate::logging::{log_error, log_volume_operation};
use crate::provider::ObjectStore;
use crate::state_machine::InternalStatus;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// One file to upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadJob {
    pub volume_id: String,
    pub source: PathBuf,
    pub bucket: String,
    pub key: String,
}

#[derive(Debug)]
struct UploadReport {
    volume_id: String,
    result: Result<()>,
}

/// Runs one run's uploads and keeps abort handles for its live workers
pub struct UploadCoordinator {
    object_store: Arc<dyn ObjectStore>,
    poll_interval: Duration,
    live_workers: Mutex<Vec<AbortHandle>>,
}

impl std::fmt::Debug for UploadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCoordinator")
            .field("poll_interval", &self.poll_interval)
            .field("live_workers", &self.live_workers.lock().len())
            .finish()
    }
}

impl UploadCoordinator {
    pub fn new(object_store: Arc<dyn ObjectStore>, poll_interval: Duration) -> Self {
        Self {
            object_store,
            poll_interval,
            live_workers: Mutex::new(Vec::new()),
        }
    }

    /// Number of workers started by the current batch that were not yet reaped
    pub fn live_worker_count(&self) -> usize {
        self.live_workers
            .lock()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Upload every job concurrently; returns once all succeeded
    #[instrument(skip(self, jobs, token), fields(jobs = jobs.len()))]
    pub async fn upload_all(
        &self,
        process_id: &str,
        jobs: Vec<UploadJob>,
        token: &CancellationToken,
    ) -> Result<()> {
        let total = jobs.len();
        if total == 0 {
            debug!(process_id = %process_id, "No uploads to run");
            return Ok(());
        }

        let (tx, mut rx) = mpsc::channel::<UploadReport>(total);
        let mut workers = JoinSet::new();
        {
            let mut live = self.live_workers.lock();
            live.clear();
            for job in jobs {
                let store = Arc::clone(&self.object_store);
                let tx = tx.clone();
                let abort = workers.spawn(async move {
                    let result = store.upload_object(&job.bucket, &job.key, &job.source).await;
                    // Receiver gone means the batch was already abandoned
                    let _ = tx
                        .send(UploadReport {
                            volume_id: job.volume_id,
                            result,
                        })
                        .await;
                });
                live.push(abort);
            }
        }
        drop(tx);

        info!(process_id = %process_id, total, "📤 Uploads started");

        let mut finished = 0usize;
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        while finished < total {
            tokio::select! {
                report = rx.recv() => {
                    let Some(report) = report else {
                        self.interrupt_all();
                        return Err(MigrationError::provider(
                            "upload_object",
                            format!("{} upload worker(s) exited without reporting", total - finished),
                        ));
                    };
                    match report.result {
                        Ok(()) => {
                            finished += 1;
                            log_volume_operation(
                                "upload",
                                process_id,
                                &report.volume_id,
                                "uploaded",
                                None,
                            );
                        }
                        Err(err) => {
                            log_error(
                                components::UPLOAD_COORDINATOR,
                                "upload_object",
                                &err.to_string(),
                                Some(&report.volume_id),
                            );
                            self.interrupt_all();
                            workers.abort_all();
                            return Err(err);
                        }
                    }
                }
                _ = token.cancelled() => {
                    warn!(process_id = %process_id, finished, total, "🛑 Uploads interrupted by cancellation");
                    self.interrupt_all();
                    workers.abort_all();
                    return Err(MigrationError::cancelled(process_id, InternalStatus::UploadToStorage));
                }
                _ = ticker.tick() => {
                    debug!(process_id = %process_id, finished, total, "Upload progress");
                }
            }
        }

        // Reap the finished tasks so none outlive the batch
        while workers.join_next().await.is_some() {}
        self.live_workers.lock().clear();

        info!(process_id = %process_id, total, "✅ All uploads finished");
        Ok(())
    }

    /// Abort every live worker; safe to call repeatedly
    pub fn interrupt_all(&self) {
        let mut live = self.live_workers.lock();
        let count = live.iter().filter(|handle| !handle.is_finished()).count();
        for handle in live.drain(..) {
            handle.abort();
        }
        if count > 0 {
            warn!(interrupted = count, "Upload workers interrupted");
        }
    }
}
