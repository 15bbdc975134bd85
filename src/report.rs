//! Reporter interface for scan observations
//!
//! Every pipeline stage receives a [`ScanReporter`] instead of logging through
//! a global. The binary wires in [`TracingReporter`]; tests use a recording
//! implementation to assert on what was observed.

use crate::record::FileFailure;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Observer for scan progress and per-file outcomes
pub trait ScanReporter: Send + Sync {
    /// Run is starting
    fn run_started(&self, root: &Path, output: &Path, concurrency: usize);

    /// A directory has been fully listed
    fn directory_scanned(&self, dir: &Path, file_count: usize);

    /// A directory below the root could not be listed
    fn directory_skipped(&self, dir: &Path, reason: &str);

    /// A file could not be recorded
    fn file_failed(&self, failure: &FileFailure);

    /// A shard was folded into the final output
    fn shard_merged(&self, shard: &Path, bytes: u64);

    /// Run finished
    fn run_finished(&self, total_files: u64, elapsed: Duration);
}

/// Reporter that emits `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ScanReporter for TracingReporter {
    fn run_started(&self, root: &Path, output: &Path, concurrency: usize) {
        info!(
            root = %root.display(),
            output = %output.display(),
            concurrency,
            "Starting scan"
        );
    }

    fn directory_scanned(&self, dir: &Path, file_count: usize) {
        info!("[{}] files count {}", dir.display(), file_count);
    }

    fn directory_skipped(&self, dir: &Path, reason: &str) {
        warn!(dir = %dir.display(), reason, "Directory skipped");
    }

    fn file_failed(&self, failure: &FileFailure) {
        warn!(path = %failure.path.display(), error = %failure.error, "File failed");
    }

    fn shard_merged(&self, shard: &Path, bytes: u64) {
        debug!(shard = %shard.display(), bytes, "Shard merged");
    }

    fn run_finished(&self, total_files: u64, elapsed: Duration) {
        info!(
            files = total_files,
            elapsed_secs = elapsed.as_secs_f64(),
            "Scan finished"
        );
    }
}

/// Reporter that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ScanReporter for NullReporter {
    fn run_started(&self, _: &Path, _: &Path, _: usize) {}
    fn directory_scanned(&self, _: &Path, _: usize) {}
    fn directory_skipped(&self, _: &Path, _: &str) {}
    fn file_failed(&self, _: &FileFailure) {}
    fn shard_merged(&self, _: &Path, _: u64) {}
    fn run_finished(&self, _: u64, _: Duration) {}
}
