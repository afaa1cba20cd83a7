use std::sync::Arc;
use std::time::Duration;

use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::modules::encode::model::EncodeJob;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("encode queue is closed")]
    Closed,

    #[error("encode queue stayed full for {0:?}")]
    Full(Duration),
}

/// Work executed for each dequeued job.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    async fn handle(&self, job: EncodeJob, cancel: CancellationToken) -> anyhow::Result<()>;
}

/// Bounded in-process queue in front of a fixed pool of workers.
///
/// A successful submit means the job was accepted, not that it finished.
/// Failed jobs are logged and dropped; there is no retry.
#[derive(Clone)]
pub struct JobDispatcher {
    sender: Sender<EncodeJob>,
    receiver: Receiver<EncodeJob>,
}

impl JobDispatcher {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = async_channel::bounded(capacity);
        Self { sender, receiver }
    }

    /// Waits for a free slot when the queue is full.
    pub async fn submit(&self, job: EncodeJob) -> Result<(), DispatchError> {
        self.sender.send(job).await.map_err(|_| DispatchError::Closed)
    }

    /// Like `submit`, but gives up once `timeout` passes without a free slot.
    pub async fn submit_within(
        &self,
        job: EncodeJob,
        timeout: Duration,
    ) -> Result<(), DispatchError> {
        match tokio::time::timeout(timeout, self.sender.send(job)).await {
            Ok(result) => result.map_err(|_| DispatchError::Closed),
            Err(_) => Err(DispatchError::Full(timeout)),
        }
    }

    pub fn queued(&self) -> usize {
        self.sender.len()
    }

    pub fn run(&self, workers: usize, handler: Arc<dyn JobHandler>) -> WorkerPool {
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();

        for worker in 0..workers {
            let receiver = self.receiver.clone();
            let handler = handler.clone();
            let cancel = cancel.clone();

            tracker.spawn(async move {
                info!(worker, "Encode worker started");
                while let Ok(job) = receiver.recv().await {
                    info!(worker, video_id = %job.video_id, job_id = %job.job_id, "Received encode job");
                    let video_id = job.video_id.clone();
                    let job_id = job.job_id;

                    match handler.handle(job, cancel.clone()).await {
                        Ok(()) => info!(worker, video_id = %video_id, job_id = %job_id, "Encode job completed"),
                        Err(e) => error!(worker, video_id = %video_id, job_id = %job_id, "Encode job failed: {:#}", e),
                    }
                }
                info!(worker, "Job queue closed, worker exiting");
            });
        }
        tracker.close();

        WorkerPool { tracker, cancel }
    }

    /// Stops accepting jobs. Already queued jobs are still handed to workers.
    pub fn shutdown(&self) {
        if self.sender.close() {
            info!(queued = self.queued(), "Encode queue closed");
        }
    }
}

pub struct WorkerPool {
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Resolves once the queue is closed and every worker has exited.
    pub async fn join(&self) {
        self.tracker.wait().await;
    }

    /// Waits up to `grace` for workers to drain the queue, then cancels
    /// running transcodes so the remaining jobs fail fast.
    pub async fn drain(&self, grace: Duration) {
        if tokio::time::timeout(grace, self.join()).await.is_err() {
            warn!(?grace, "Workers still busy after grace period, cancelling in-flight encodes");
            self.cancel.cancel();
            self.tracker.wait().await;
        }
        info!("All encode workers stopped");
    }
}
