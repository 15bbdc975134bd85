//! Error types for tree-digest
//!
//! Two classes of error flow through the pipeline:
//! - Per-file errors ([`FileError`]) are isolated to one path. They end up in
//!   the run summary as a [`crate::record::FileFailure`] and never abort the run.
//! - Run-level errors ([`ScanError`] and its sources) abort the run and move it
//!   to the `Failed` state.
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Errors should be actionable - include the path that caused them
//! - Preserve error chains for debugging

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for a scan run
#[derive(Error, Debug)]
pub enum ScanError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Root directory errors
    #[error("Walk error: {0}")]
    Walk(#[from] WalkError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Merge errors (lost or unreadable shards, unwritable output)
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    /// I/O errors outside of per-file processing
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid concurrency {count}: must be between 1 and {max}")]
    InvalidConcurrency { count: usize, max: usize },

    /// Invalid queue size
    #[error("Invalid queue size {size}: must be at least {min}")]
    InvalidQueueSize { size: usize, min: usize },

    /// Invalid chunk size
    #[error("Invalid chunk size {size}: must be between {min} and {max} bytes")]
    InvalidChunkSize { size: usize, min: usize, max: usize },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },
}

/// Errors raised by the walker for the scan root
#[derive(Error, Debug)]
pub enum WalkError {
    /// Root does not exist
    #[error("Scan root not found: '{path}'")]
    RootNotFound { path: PathBuf },

    /// Root exists but is not a directory
    #[error("Scan root is not a directory: '{path}'")]
    RootNotADirectory { path: PathBuf },

    /// Root could not be inspected
    #[error("Failed to access scan root '{path}': {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Worker initialization failed (thread spawn or shard creation)
    #[error("Failed to initialize worker {id}: {reason}")]
    InitFailed { id: usize, reason: String },

    /// Shard could not be flushed or closed
    #[error("Worker {id} failed to write shard '{path}': {source}")]
    ShardWrite {
        id: usize,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// All workers died
    #[error("All workers have terminated unexpectedly")]
    AllWorkersDead,
}

/// Errors raised while merging shards into the final output
#[derive(Error, Debug)]
pub enum MergeError {
    /// Shard is gone before merge
    #[error("Shard '{path}' is missing; its records would be lost")]
    ShardMissing { path: PathBuf },

    /// Shard exists but could not be read
    #[error("Failed to read shard '{path}': {source}")]
    ShardUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Final output could not be written
    #[error("Failed to write output '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Per-file errors, caught at the worker boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileError {
    /// File vanished between discovery and read
    #[error("file not found")]
    NotFound,

    /// Permission denied
    #[error("permission denied")]
    PermissionDenied,

    /// Path no longer refers to a regular file
    #[error("not a regular file")]
    NotRegular,

    /// Any other I/O failure (including mid-read)
    #[error("I/O error: {0}")]
    Io(String),

    /// Run was cancelled before this file was processed
    #[error("scan cancelled before file was processed")]
    Cancelled,
}

impl FileError {
    /// Classify an I/O error from open/stat/read
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FileError::NotFound,
            io::ErrorKind::PermissionDenied => FileError::PermissionDenied,
            _ => FileError::Io(err.to_string()),
        }
    }

    /// True if this failure comes from the filesystem rather than cancellation
    pub fn is_filesystem(&self) -> bool {
        !matches!(self, FileError::Cancelled)
    }
}

/// Result type alias for ScanError
pub type Result<T> = std::result::Result<T, ScanError>;

/// Result type alias for WalkError
pub type WalkResult<T> = std::result::Result<T, WalkError>;

/// Result type alias for MergeError
pub type MergeResult<T> = std::result::Result<T, MergeError>;
