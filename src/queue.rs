//! Import Job Queue
//!
//! Bounded FIFO queue of import jobs with a single consumer loop. Enqueueing waits
//! while the queue is full. Jobs for the same deposit are therefore never executed
//! concurrently with each other.

mod memory;
pub mod runner;

use crate::deposit::DepositLedger;
use crate::error::ImportError;
use crate::import::{ImportJob, ImportJobResult, ImportJobStatus};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use runner::{ImportJobRunner, RepositoryWriter};

/// Queue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Jobs that can wait before `enqueue` blocks
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Finished results kept for lookup; the oldest is dropped beyond this
    #[serde(default = "default_retained_results")]
    pub retained_results: usize,
}

fn default_capacity() -> usize {
    100
}

fn default_retained_results() -> usize {
    1000
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            retained_results: default_retained_results(),
        }
    }
}

/// Applies an import job to the repository
#[async_trait]
pub trait ImportJobExecutor: Send + Sync {
    /// Execute the job. Item failures are reported in the result, never as a panic.
    async fn execute(&self, job: &ImportJob) -> ImportJobResult;
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Jobs enqueued and not yet started
    pub pending: usize,
    /// Jobs currently executing
    pub processing: usize,
    /// Jobs finished without item errors
    pub completed: usize,
    /// Jobs finished with at least one item error
    pub completed_with_errors: usize,
}

/// Results by job id. Finished ids are kept in completion order for eviction.
#[derive(Default)]
struct ResultStore {
    results: HashMap<String, ImportJobResult>,
    finished: VecDeque<String>,
}

impl ResultStore {
    fn finish(&mut self, job_id: &str, result: ImportJobResult, retained: usize) {
        self.results.insert(job_id.to_string(), result);
        self.finished.push_back(job_id.to_string());
        while self.finished.len() > retained {
            if let Some(oldest) = self.finished.pop_front() {
                self.results.remove(&oldest);
                debug!(job = %oldest, "Evicted import job result");
            }
        }
    }
}

fn is_finished(status: ImportJobStatus) -> bool {
    matches!(
        status,
        ImportJobStatus::Completed | ImportJobStatus::CompletedWithErrors
    )
}

pub struct ImportJobQueue {
    sender: Mutex<Option<mpsc::Sender<ImportJob>>>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<ImportJob>>,
    results: RwLock<ResultStore>,
    stats: RwLock<QueueStats>,
    deposits: Option<Arc<DepositLedger>>,
    retained_results: usize,
}

impl ImportJobQueue {
    pub fn new(settings: &QueueSettings) -> Self {
        let (sender, receiver) = mpsc::channel(settings.capacity.max(1));
        Self {
            sender: Mutex::new(Some(sender)),
            receiver: tokio::sync::Mutex::new(receiver),
            results: RwLock::new(ResultStore::default()),
            stats: RwLock::new(QueueStats::default()),
            deposits: None,
            retained_results: settings.retained_results.max(1),
        }
    }

    /// A queue that claims deposits through `deposits` on [`submit`](Self::submit)
    /// and releases them when their job finishes.
    pub fn with_deposits(settings: &QueueSettings, deposits: Arc<DepositLedger>) -> Self {
        Self {
            deposits: Some(deposits),
            ..Self::new(settings)
        }
    }

    /// Add a job, waiting while the queue is full. Returns the waiting result.
    pub async fn enqueue(&self, job: ImportJob) -> Result<ImportJobResult, ImportError> {
        let sender = self.sender.lock().clone().ok_or(ImportError::QueueClosed)?;
        let waiting = ImportJobResult::waiting(&job);
        let job_id = job.id.clone();

        self.results.write().results.insert(job_id.clone(), waiting.clone());
        {
            let mut stats = self.stats.write();
            stats.pending += 1;
        }

        if sender.send(job).await.is_err() {
            self.results.write().results.remove(&job_id);
            let mut stats = self.stats.write();
            stats.pending = stats.pending.saturating_sub(1);
            return Err(ImportError::QueueClosed);
        }

        debug!(job = %job_id, archival_group = %waiting.archival_group, "Enqueued import job");
        Ok(waiting)
    }

    /// Enqueue a job for a deposit. The deposit must be at `version_tag` and have no
    /// other active job; it stays claimed until the job finishes.
    pub async fn submit(
        &self,
        job: ImportJob,
        version_tag: &str,
    ) -> Result<ImportJobResult, ImportError> {
        let deposits = self
            .deposits
            .as_ref()
            .ok_or_else(|| ImportError::Invariant("import job queue has no deposit ledger".to_string()))?;
        let deposit_id = job
            .deposit_id
            .clone()
            .ok_or_else(|| ImportError::Invariant(format!("import job {} has no deposit", job.id)))?;
        let job_id = job.id.clone();

        deposits.claim(&deposit_id, version_tag, &job_id)?;
        match self.enqueue(job).await {
            Ok(waiting) => Ok(waiting),
            Err(e) => {
                deposits.release(&deposit_id, &job_id, false);
                Err(e)
            }
        }
    }

    /// Stop accepting jobs. Jobs already queued are still processed.
    pub fn close(&self) {
        if self.sender.lock().take().is_some() {
            debug!("Import job queue closed");
        }
    }

    /// Latest known result for a job
    pub fn result(&self, job_id: &str) -> Option<ImportJobResult> {
        self.results.read().results.get(job_id).cloned()
    }

    /// Remove and return a finished result. Waiting or running results stay.
    pub fn take_result(&self, job_id: &str) -> Option<ImportJobResult> {
        let mut store = self.results.write();
        if !is_finished(store.results.get(job_id)?.status) {
            return None;
        }
        store.finished.retain(|id| id != job_id);
        store.results.remove(job_id)
    }

    pub fn stats(&self) -> QueueStats {
        self.stats.read().clone()
    }

    /// The consumer loop: execute jobs in arrival order until the queue is closed and
    /// drained, or `cancel` fires. Returns the number of jobs executed.
    ///
    /// A job already executing when `cancel` fires is finished first. Only one loop
    /// may run at a time. The loop can be started again after it returns or after its
    /// future is dropped; jobs still buffered are kept.
    pub async fn run(
        &self,
        executor: &dyn ImportJobExecutor,
        cancel: &CancellationToken,
    ) -> Result<usize, ImportError> {
        let mut receiver = self
            .receiver
            .try_lock()
            .map_err(|_| ImportError::Invariant("import job queue already has a consumer".to_string()))?;

        info!("Import job queue consumer started");
        let mut executed = 0;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Import job queue consumer cancelled");
                    break;
                }
                next = receiver.recv() => next,
            };
            let Some(job) = next else {
                break;
            };
            self.process(executor, &job).await;
            executed += 1;
        }

        info!(executed, "Import job queue consumer stopped");
        Ok(executed)
    }

    async fn process(&self, executor: &dyn ImportJobExecutor, job: &ImportJob) {
        {
            let mut stats = self.stats.write();
            stats.pending = stats.pending.saturating_sub(1);
            stats.processing += 1;
        }
        let submitted = self.results.write().results.get_mut(&job.id).map(|waiting| {
            waiting.begin();
            (waiting.id.clone(), waiting.date_submitted)
        });

        let mut result = executor.execute(job).await;
        if let Some((id, date_submitted)) = submitted {
            result.id = id;
            result.date_submitted = date_submitted;
        }

        {
            let mut stats = self.stats.write();
            stats.processing = stats.processing.saturating_sub(1);
            match result.status {
                ImportJobStatus::CompletedWithErrors => stats.completed_with_errors += 1,
                _ => stats.completed += 1,
            }
        }
        if result.status == ImportJobStatus::CompletedWithErrors {
            warn!(
                job = %job.id,
                archival_group = %job.archival_group,
                errors = result.errors.len(),
                "Import job completed with errors"
            );
        } else {
            info!(job = %job.id, archival_group = %job.archival_group, "Import job completed");
        }
        if let (Some(deposits), Some(deposit_id)) = (&self.deposits, &job.deposit_id) {
            deposits.release(deposit_id, &job.id, result.status == ImportJobStatus::Completed);
        }
        self.results
            .write()
            .finish(&job.id, result, self.retained_results);
    }
}
