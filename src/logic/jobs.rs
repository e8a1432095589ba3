use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::logic::uri::{UriUpdateReport, UriUpdater};
use crate::model::Id;
use crate::store::traits::PageStore;

/// A queued uri recomputation for one page and its descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriJob {
    pub id: Uuid,
    pub page_id: Id,
}

impl UriJob {
    pub fn new(page_id: Id) -> Self {
        Self {
            id: Uuid::new_v4(),
            page_id,
        }
    }
}

/// Where the page service sends uri updates. Dispatch never blocks the
/// request and never reports failure back to it.
pub trait UriJobQueue: Send + Sync {
    fn dispatch(&self, page_id: Id);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Channel-backed queue drained by a background tokio task.
#[derive(Debug, Clone)]
pub struct UriJobWorker {
    sender: mpsc::UnboundedSender<UriJob>,
}

impl UriJobWorker {
    /// Spawn the worker loop on the current runtime. The loop ends once
    /// every sender has been dropped and the channel is drained.
    pub fn spawn<S: PageStore + 'static>(store: Arc<S>, policy: RetryPolicy) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(worker_loop(store, receiver, policy));
        (Self { sender }, handle)
    }
}

impl UriJobQueue for UriJobWorker {
    fn dispatch(&self, page_id: Id) {
        let job = UriJob::new(page_id);
        log::debug!("queueing uri job {} for page {}", job.id, page_id);
        if self.sender.send(job).is_err() {
            log::error!("uri worker has stopped, dropping update for page {}", page_id);
        }
    }
}

async fn worker_loop<S: PageStore>(
    store: Arc<S>,
    mut receiver: mpsc::UnboundedReceiver<UriJob>,
    policy: RetryPolicy,
) {
    log::info!("uri worker started");
    while let Some(job) = receiver.recv().await {
        run_with_retry(&*store, &job, policy).await;
    }
    log::info!("uri worker stopped");
}

/// Run one job, retrying with linear backoff. Returns `None` once every
/// attempt has failed.
pub async fn run_with_retry<S: PageStore + ?Sized>(
    store: &S,
    job: &UriJob,
    policy: RetryPolicy,
) -> Option<UriUpdateReport> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        match UriUpdater::run(store, job.page_id).await {
            Ok(report) => {
                log::info!(
                    "uri job {} for page {} done: {} visited, {} updated",
                    job.id,
                    job.page_id,
                    report.visited,
                    report.updated.len()
                );
                return Some(report);
            }
            Err(e) if attempt < attempts => {
                log::warn!(
                    "uri job {} for page {} failed (attempt {}/{}): {:#}",
                    job.id,
                    job.page_id,
                    attempt,
                    attempts,
                    e
                );
                tokio::time::sleep(policy.backoff * attempt).await;
            }
            Err(e) => {
                log::error!(
                    "uri job {} for page {} gave up after {} attempts: {:#}",
                    job.id,
                    job.page_id,
                    attempts,
                    e
                );
            }
        }
    }
    None
}

/// Collects jobs until they are run explicitly with [`PendingUriJobs::run_pending`].
#[derive(Debug, Default)]
pub struct PendingUriJobs {
    jobs: Mutex<VecDeque<UriJob>>,
}

impl PendingUriJobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    pub fn page_ids(&self) -> Vec<Id> {
        self.jobs.lock().iter().map(|job| job.page_id).collect()
    }

    /// Run every queued job in dispatch order, including jobs queued while
    /// draining. Returns how many jobs ran.
    pub async fn run_pending<S: PageStore + ?Sized>(&self, store: &S) -> anyhow::Result<usize> {
        let mut ran = 0;
        loop {
            let next = self.jobs.lock().pop_front();
            let Some(job) = next else {
                return Ok(ran);
            };
            UriUpdater::run(store, job.page_id).await?;
            ran += 1;
        }
    }
}

impl UriJobQueue for PendingUriJobs {
    fn dispatch(&self, page_id: Id) {
        self.jobs.lock().push_back(UriJob::new(page_id));
    }
}
