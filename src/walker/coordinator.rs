//! Scan coordinator - orchestrates the parallel scan
//!
//! The coordinator is responsible for:
//! - Setting up the work queue, shards and workers
//! - Feeding walker output into the queue (with backpressure)
//! - Signal handling (graceful shutdown)
//! - The end-of-run barrier, merge and final statistics

use crate::config::ScanJob;
use crate::content::Digester;
use crate::error::{Result, ScanError, WorkerError};
use crate::output::{merge_shards, remove_shards, shard_path};
use crate::record::{write_failure_report, FileFailure};
use crate::report::ScanReporter;
use crate::walker::queue::{FileTask, QueueClosed, QueueStats, WorkQueue, WorkQueueSender};
use crate::walker::tree::{WalkStats, Walker};
use crate::walker::worker::{ScanCounters, Worker, WorkerOutput};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Lifecycle of one run
///
/// `Scanning` and `Dispatching` alternate while the walker feeds the queue.
/// `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Init = 0,
    Scanning = 1,
    Dispatching = 2,
    Draining = 3,
    Merging = 4,
    Done = 5,
    Failed = 6,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RunState::Init,
            1 => RunState::Scanning,
            2 => RunState::Dispatching,
            3 => RunState::Draining,
            4 => RunState::Merging,
            5 => RunState::Done,
            _ => RunState::Failed,
        }
    }

    /// True for `Done` and `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Init => "init",
            RunState::Scanning => "scanning",
            RunState::Dispatching => "dispatching",
            RunState::Draining => "draining",
            RunState::Merging => "merging",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Shared, queryable run state
#[derive(Debug, Clone)]
pub struct RunStatus(Arc<AtomicU8>);

impl RunStatus {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(RunState::Init as u8)))
    }

    /// Current state
    pub fn get(&self) -> RunState {
        RunState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, state: RunState) {
        // Terminal states stick
        let _ = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                if RunState::from_u8(current).is_terminal() {
                    None
                } else {
                    Some(state as u8)
                }
            });
    }
}

/// Result of a completed run
#[derive(Debug)]
pub struct RunSummary {
    /// Files discovered and submitted
    pub files_discovered: u64,

    /// Rows written to the output
    pub records: u64,

    /// Files that could not be recorded
    pub failures: Vec<FileFailure>,

    /// Walker counters
    pub walk: WalkStats,

    /// Total bytes hashed
    pub bytes_hashed: u64,

    /// Time taken for the run
    pub elapsed: Duration,

    /// Final state
    pub state: RunState,

    /// Whether submission stopped early on a shutdown request
    pub interrupted: bool,
}

impl RunSummary {
    /// Number of per-file failures
    pub fn failure_count(&self) -> u64 {
        self.failures.len() as u64
    }

    /// Failures for files that were never processed because of a shutdown
    pub fn cancelled_count(&self) -> u64 {
        self.failures
            .iter()
            .filter(|f| !f.error.is_filesystem())
            .count() as u64
    }

    /// Every discovered file is either a record or a failure
    pub fn is_consistent(&self) -> bool {
        self.files_discovered == self.records + self.failure_count()
    }
}

/// Progress information for display
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Files discovered so far
    pub discovered: u64,

    /// Records written
    pub records: u64,

    /// Failures so far
    pub failures: u64,

    /// Bytes hashed
    pub bytes: u64,

    /// Worker count
    pub concurrency: usize,

    /// Workers busy with a file right now
    pub active_workers: usize,

    /// Tasks waiting in the queue
    pub queued: u64,

    /// Current state
    pub state: RunState,

    /// Elapsed time
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Submitted but not finished
    pub fn pending(&self) -> u64 {
        self.discovered
            .saturating_sub(self.records + self.failures)
    }

    /// Calculate files per second rate
    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.records + self.failures) as f64 / secs
        } else {
            0.0
        }
    }
}

/// Coordinates the parallel scan
pub struct ScanCoordinator {
    job: Arc<ScanJob>,
    digester: Arc<dyn Digester>,
    reporter: Arc<dyn ScanReporter>,
    counters: Arc<ScanCounters>,
    queue_stats: Arc<QueueStats>,
    shutdown: Arc<AtomicBool>,
    status: RunStatus,
}

impl ScanCoordinator {
    /// Create a coordinator using the job's digest algorithm
    pub fn new(job: ScanJob, reporter: Arc<dyn ScanReporter>) -> Self {
        let digester = job.digester();
        Self::with_digester(job, digester, reporter)
    }

    /// Create a coordinator with an explicit digester
    pub fn with_digester(
        job: ScanJob,
        digester: Arc<dyn Digester>,
        reporter: Arc<dyn ScanReporter>,
    ) -> Self {
        Self {
            job: Arc::new(job),
            digester,
            reporter,
            counters: Arc::new(ScanCounters::default()),
            queue_stats: Arc::new(QueueStats::default()),
            shutdown: Arc::new(AtomicBool::new(false)),
            status: RunStatus::new(),
        }
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Handle for querying the run state
    pub fn status(&self) -> RunStatus {
        self.status.clone()
    }

    /// Run the scan to completion
    pub fn run(self) -> Result<RunSummary> {
        let start = Instant::now();

        match self.run_inner(start) {
            Ok(summary) => {
                self.status.set(RunState::Done);
                Ok(RunSummary {
                    state: RunState::Done,
                    ..summary
                })
            }
            Err(e) => {
                self.status.set(RunState::Failed);
                error!(error = %e, "Scan failed");
                Err(e)
            }
        }
    }

    /// Run the scan, calling `progress_callback` periodically from a helper thread
    pub fn run_with_progress<F>(self, progress_callback: F) -> Result<RunSummary>
    where
        F: Fn(ScanProgress) + Send + 'static,
    {
        let start = Instant::now();
        let finished = Arc::new(AtomicBool::new(false));
        let counters = Arc::clone(&self.counters);
        let queue_stats = Arc::clone(&self.queue_stats);
        let status = self.status.clone();
        let concurrency = self.job.concurrency;

        let progress_handle = {
            let finished = Arc::clone(&finished);
            thread::spawn(move || loop {
                progress_callback(snapshot(
                    &counters,
                    &queue_stats,
                    &status,
                    concurrency,
                    start.elapsed(),
                ));
                if finished.load(Ordering::Relaxed) {
                    break;
                }
                thread::sleep(Duration::from_millis(100));
            })
        };

        let result = self.run();

        finished.store(true, Ordering::SeqCst);
        let _ = progress_handle.join();

        result
    }

    fn run_inner(&self, start: Instant) -> Result<RunSummary> {
        let job = &self.job;
        job.validate()?;

        let walker = Walker::new(&job.root, Arc::clone(&self.reporter))?;
        self.reporter
            .run_started(walker.root(), &job.output, job.concurrency);

        let shard_paths: Vec<PathBuf> = (0..job.concurrency)
            .map(|id| shard_path(&job.output, id))
            .collect();

        // The scan's own artifacts may live inside the tree being scanned
        let mut owned = shard_paths.clone();
        owned.push(job.output.clone());
        owned.extend(job.failures_path.clone());

        let walker = walker.exclude(owned);

        let queue = WorkQueue::with_stats(job.queue_size, Arc::clone(&self.queue_stats));
        debug!(capacity = queue.capacity(), "Work queue created");
        let (sender, receiver) = queue.split();

        let mut workers = Vec::with_capacity(job.concurrency);
        for (id, path) in shard_paths.iter().enumerate() {
            match Worker::spawn(
                id,
                path.clone(),
                receiver.clone(),
                Arc::clone(&self.digester),
                Arc::clone(&self.reporter),
                Arc::clone(&self.counters),
                Arc::clone(&self.shutdown),
            ) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    drop(sender);
                    let _ = join_workers(workers);
                    remove_shards(&shard_paths);
                    return Err(e.into());
                }
            }
        }
        drop(receiver);

        info!(
            count = workers.len(),
            digest = self.digester.name(),
            "Workers spawned"
        );

        let dispatched = self.dispatch(&walker, &sender);

        // Closing the queue lets workers drain and exit
        drop(sender);
        self.status.set(RunState::Draining);
        info!(
            files = self.counters.discovered.load(Ordering::Relaxed),
            backpressure = self.queue_stats.backpressure_count(),
            "Done scanning, waiting for workers to finish"
        );

        let (outputs, (walk, interrupted)) = match (join_workers(workers), dispatched) {
            (Ok(outputs), Ok(dispatched)) => (outputs, dispatched),
            // A worker error names the root cause of a dispatch failure
            (Err(e), _) | (Ok(_), Err(e)) => {
                remove_shards(&shard_paths);
                return Err(e);
            }
        };

        let mut shards = Vec::with_capacity(outputs.len());
        let mut records = 0u64;
        let mut failures = Vec::new();
        for output in outputs {
            records += output.shard.rows;
            shards.push(output.shard.path);
            failures.extend(output.failures);
        }

        self.status.set(RunState::Merging);
        info!("Workers done, merging result shards");
        let merge = merge_shards(&shards, &job.output, self.reporter.as_ref())?;

        // The output is already in place, so a report problem does not fail the run
        if let Some(path) = &job.failures_path {
            match write_failure_report(path, &failures) {
                Ok(()) => {
                    info!(path = %path.display(), count = failures.len(), "Failure report written");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to write failure report");
                }
            }
        }

        let files_discovered = self.counters.discovered.load(Ordering::SeqCst);
        let summary = RunSummary {
            files_discovered,
            records,
            failures,
            walk,
            bytes_hashed: self.counters.bytes.load(Ordering::SeqCst),
            elapsed: start.elapsed(),
            state: RunState::Merging,
            interrupted,
        };

        if !summary.is_consistent() {
            warn!(
                discovered = summary.files_discovered,
                records = summary.records,
                failures = summary.failure_count(),
                "Record accounting mismatch"
            );
        }

        info!(
            shards = merge.shards,
            output = %job.output.display(),
            "All done, result file written"
        );
        self.reporter.run_finished(files_discovered, summary.elapsed);

        Ok(summary)
    }

    /// Feed walker output into the queue until the tree is exhausted or shutdown
    fn dispatch(&self, walker: &Walker, sender: &WorkQueueSender) -> Result<(WalkStats, bool)> {
        let mut iter = walker.iter();

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                info!("Shutdown signal received, no more files will be submitted");
                return Ok((iter.stats(), true));
            }

            self.status.set(RunState::Scanning);
            let Some(path) = iter.next() else {
                break;
            };

            self.status.set(RunState::Dispatching);
            self.counters.discovered.fetch_add(1, Ordering::Relaxed);

            if let Err(QueueClosed(task)) = sender.submit(FileTask::new(path)) {
                error!(path = %task.path.display(), "No worker left to accept task");
                return Err(ScanError::Worker(WorkerError::AllWorkersDead));
            }
        }

        Ok((iter.stats(), false))
    }
}

fn snapshot(
    counters: &ScanCounters,
    queue_stats: &QueueStats,
    status: &RunStatus,
    concurrency: usize,
    elapsed: Duration,
) -> ScanProgress {
    ScanProgress {
        discovered: counters.discovered.load(Ordering::Relaxed),
        records: counters.records.load(Ordering::Relaxed),
        failures: counters.failures.load(Ordering::Relaxed),
        bytes: counters.bytes.load(Ordering::Relaxed),
        concurrency,
        active_workers: queue_stats.active(),
        queued: queue_stats.queued(),
        state: status.get(),
        elapsed,
    }
}

/// Join every worker; the first error wins but all workers are joined
fn join_workers(workers: Vec<Worker>) -> Result<Vec<WorkerOutput>> {
    let mut outputs = Vec::with_capacity(workers.len());
    let mut first_err: Option<ScanError> = None;

    for worker in workers {
        let id = worker.id();
        match worker.join() {
            Ok(output) => outputs.push(output),
            Err(e) => {
                error!(worker = id, error = %e, "Worker failed");
                if first_err.is_none() {
                    first_err = Some(e.into());
                }
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(outputs),
    }
}
