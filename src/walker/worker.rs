//! Worker thread logic for parallel file digesting
//!
//! Each worker:
//! - Owns one shard file through its [`WorkerContext`]
//! - Pulls file tasks from the work queue
//! - Reads metadata and streams the digest for each file
//! - Writes one row per file to its shard
//! - Keeps per-file failures local and returns them on join

use crate::content::{Digester, FileMetadata};
use crate::error::{FileError, WorkerError};
use crate::output::{ShardInfo, ShardWriter};
use crate::record::{FileFailure, FileRecord};
use crate::report::ScanReporter;
use crate::walker::queue::{WorkGuard, WorkQueueReceiver};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// Counters shared by all workers and the coordinator
#[derive(Debug, Default)]
pub struct ScanCounters {
    /// Files discovered and submitted
    pub discovered: AtomicU64,

    /// Records written
    pub records: AtomicU64,

    /// Per-file failures
    pub failures: AtomicU64,

    /// Bytes hashed
    pub bytes: AtomicU64,
}

impl ScanCounters {
    fn record_file(&self, bytes: u64) {
        self.records.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Tasks that have reached a final outcome
    pub fn completed(&self) -> u64 {
        self.records.load(Ordering::Relaxed) + self.failures.load(Ordering::Relaxed)
    }
}

/// Digest one file
///
/// Reads size and timestamps from the opened handle, then streams the content
/// through the digester. Any I/O problem becomes a typed [`FileError`].
pub fn process_file(path: &Path, digester: &dyn Digester) -> Result<FileRecord, FileError> {
    // lstat first: the path may have been swapped for a symlink or FIFO since discovery
    let link_meta = fs::symlink_metadata(path).map_err(|e| FileError::from_io(&e))?;
    if !link_meta.file_type().is_file() {
        return Err(FileError::NotRegular);
    }

    let mut file = File::open(path).map_err(|e| FileError::from_io(&e))?;
    let meta = file.metadata().map_err(|e| FileError::from_io(&e))?;
    let meta = FileMetadata::from_std(&meta).ok_or(FileError::NotRegular)?;

    let (digest, _read) = digester
        .digest_reader(&mut file)
        .map_err(|e| FileError::from_io(&e))?;

    Ok(FileRecord::new(path.to_path_buf(), &meta, digest))
}

/// State owned by one worker for its whole lifetime
pub struct WorkerContext {
    id: usize,
    shard: ShardWriter,
    digester: Arc<dyn Digester>,
    reporter: Arc<dyn ScanReporter>,
    counters: Arc<ScanCounters>,
    failures: Vec<FileFailure>,
}

impl WorkerContext {
    /// Build a context, creating the worker's shard
    pub fn new(
        id: usize,
        shard_path: PathBuf,
        digester: Arc<dyn Digester>,
        reporter: Arc<dyn ScanReporter>,
        counters: Arc<ScanCounters>,
    ) -> Result<Self, WorkerError> {
        let shard = ShardWriter::create(shard_path.clone()).map_err(|e| WorkerError::InitFailed {
            id,
            reason: format!("cannot create shard '{}': {}", shard_path.display(), e),
        })?;

        Ok(Self {
            id,
            shard,
            digester,
            reporter,
            counters,
            failures: Vec::new(),
        })
    }

    /// Process one path, writing a record or keeping a failure
    pub fn process(&mut self, path: PathBuf) -> Result<(), WorkerError> {
        match process_file(&path, self.digester.as_ref()) {
            Ok(record) => {
                if record.has_lossy_path() {
                    warn!(
                        worker = self.id,
                        path = %path.display(),
                        "Path is not valid UTF-8; its row may collide with another path"
                    );
                }
                self.shard
                    .write_record(&record)
                    .map_err(|e| WorkerError::ShardWrite {
                        id: self.id,
                        path: self.shard.path().to_path_buf(),
                        source: e,
                    })?;
                self.counters.record_file(record.size);
                trace!(worker = self.id, path = %path.display(), "File digested");
            }
            Err(error) => self.fail(path, error),
        }
        Ok(())
    }

    /// Record a per-file failure
    pub fn fail(&mut self, path: PathBuf, error: FileError) {
        let failure = FileFailure::new(path, error);
        self.reporter.file_failed(&failure);
        self.counters.record_failure();
        self.failures.push(failure);
    }

    /// Flush and close the shard
    pub fn finish(self) -> Result<WorkerOutput, WorkerError> {
        let id = self.id;
        let shard_path = self.shard.path().to_path_buf();
        let shard = self.shard.finish().map_err(|e| WorkerError::ShardWrite {
            id,
            path: shard_path,
            source: e,
        })?;

        Ok(WorkerOutput {
            id,
            shard,
            failures: self.failures,
        })
    }
}

/// What a worker hands back when joined
#[derive(Debug)]
pub struct WorkerOutput {
    /// Worker ID
    pub id: usize,

    /// Closed shard
    pub shard: ShardInfo,

    /// Files that could not be recorded
    pub failures: Vec<FileFailure>,
}

/// A worker thread that digests files
pub struct Worker {
    id: usize,
    shard_path: PathBuf,
    handle: Option<JoinHandle<Result<WorkerOutput, WorkerError>>>,
}

impl Worker {
    /// Create the worker's shard and spawn its thread
    pub fn spawn(
        id: usize,
        shard_path: PathBuf,
        queue_rx: WorkQueueReceiver,
        digester: Arc<dyn Digester>,
        reporter: Arc<dyn ScanReporter>,
        counters: Arc<ScanCounters>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, WorkerError> {
        let ctx = WorkerContext::new(id, shard_path.clone(), digester, reporter, counters)?;

        let handle = thread::Builder::new()
            .name(format!("digest-{}", id))
            .spawn(move || worker_loop(ctx, queue_rx, shutdown))
            .map_err(|e| WorkerError::InitFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            shard_path,
            handle: Some(handle),
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Shard owned by this worker
    pub fn shard_path(&self) -> &Path {
        &self.shard_path
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<WorkerOutput, WorkerError> {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => {
                return Err(WorkerError::Panicked {
                    id: self.id,
                    message: "worker already joined".into(),
                })
            }
        };

        match handle.join() {
            Ok(result) => result,
            Err(payload) => Err(WorkerError::Panicked {
                id: self.id,
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker thread panicked".into()
    }
}

/// Main worker loop
///
/// Runs until the queue is closed and drained. After a shutdown request every
/// remaining task is reported as cancelled instead of being hashed.
fn worker_loop(
    mut ctx: WorkerContext,
    queue_rx: WorkQueueReceiver,
    shutdown: Arc<AtomicBool>,
) -> Result<WorkerOutput, WorkerError> {
    debug!(worker = ctx.id, "Worker starting");

    while let Some(task) = queue_rx.recv() {
        if shutdown.load(Ordering::Relaxed) {
            ctx.fail(task.path, FileError::Cancelled);
            continue;
        }

        let _guard = WorkGuard::new(&queue_rx);
        ctx.process(task.path)?;
    }

    debug!(
        worker = ctx.id,
        rows = ctx.shard.rows(),
        failures = ctx.failures.len(),
        "Worker shutting down"
    );

    ctx.finish()
}
