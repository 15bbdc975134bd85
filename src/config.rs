//! Configuration types for tree-digest
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - The validated [`ScanJob`] consumed by the coordinator

use crate::content::{Digester, Md5Digester, DEFAULT_CHUNK_SIZE};
use crate::error::ConfigError;
use clap::{Parser, ValueEnum};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Maximum reasonable worker count
const MAX_CONCURRENCY: usize = 512;

/// Minimum queue size
const MIN_QUEUE_SIZE: usize = 1;

/// Queue slots per worker when no size is given
const QUEUE_SLOTS_PER_WORKER: usize = 64;

/// Chunk size limits
const MIN_CHUNK_SIZE: usize = 512;
const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Default output file name
pub const DEFAULT_OUTPUT: &str = "files_md5.csv";

/// Digest every file under a directory tree into one CSV file
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tree-digest",
    version,
    about = "File digest calculator: walks a directory tree and records a digest for every file",
    long_about = "Walks a directory tree, computes a content digest and metadata for every \
                  regular file, and writes one CSV file with a row per file.\n\n\
                  Files are hashed in parallel; each worker writes its own shard, and the \
                  shards are merged into the output once every file has been processed.",
    after_help = "EXAMPLES:\n    \
        tree-digest --scan /data -o data_md5.csv\n    \
        tree-digest --scan . -c 16 --failures failed.csv\n    \
        tree-digest --scan /archive -q"
)]
pub struct CliArgs {
    /// Directory to scan
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub scan: PathBuf,

    /// Digest method
    #[arg(long, value_enum, default_value_t = DigestAlgorithm::Md5)]
    pub digest: DigestAlgorithm,

    /// Output file for the result
    #[arg(short, long, default_value = DEFAULT_OUTPUT, value_name = "FILE")]
    pub output: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Number of digest workers
    #[arg(
        short = 'c',
        long,
        default_value_t = default_concurrency(),
        value_name = "NUM"
    )]
    pub concurrent: usize,

    /// Pending file queue size (defaults to 64 per worker)
    #[arg(long, value_name = "NUM")]
    pub queue_size: Option<usize>,

    /// Read chunk size in bytes
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, value_name = "BYTES")]
    pub chunk_size: usize,

    /// Write files that could not be digested to this CSV file
    #[arg(long, value_name = "FILE")]
    pub failures: Option<PathBuf>,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Supported digest algorithms
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
}

/// Supported output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestAlgorithm::Md5 => f.write_str("MD5"),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => f.write_str("CSV"),
        }
    }
}

fn default_concurrency() -> usize {
    num_cpus::get()
}

/// Validated configuration for one run
#[derive(Debug, Clone)]
pub struct ScanJob {
    /// Directory to scan
    pub root: PathBuf,

    /// Absolute output path
    pub output: PathBuf,

    /// Digest algorithm
    pub digest: DigestAlgorithm,

    /// Output format
    pub format: OutputFormat,

    /// Number of worker threads
    pub concurrency: usize,

    /// Work queue capacity
    pub queue_size: usize,

    /// Read chunk size
    pub chunk_size: usize,

    /// Optional failure report path
    pub failures_path: Option<PathBuf>,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl ScanJob {
    /// Job with default settings
    pub fn new(root: impl Into<PathBuf>, output: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let concurrency = default_concurrency();
        Ok(Self {
            root: root.into(),
            output: absolute_output(output.as_ref())?,
            digest: DigestAlgorithm::Md5,
            format: OutputFormat::Csv,
            concurrency,
            queue_size: concurrency * QUEUE_SLOTS_PER_WORKER,
            chunk_size: DEFAULT_CHUNK_SIZE,
            failures_path: None,
            show_progress: false,
            verbose: false,
        })
    }

    /// Set the worker count (queue size follows unless set later)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self.queue_size = concurrency.max(1) * QUEUE_SLOTS_PER_WORKER;
        self
    }

    /// Set the queue capacity
    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size;
        self
    }

    /// Set the read chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Write a failure report to `path`
    pub fn with_failure_report(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        self.failures_path = Some(absolute_output(path.as_ref())?);
        Ok(self)
    }

    /// Create and validate a job from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let mut job = Self::new(args.scan, &args.output)?.with_concurrency(args.concurrent);

        if let Some(queue_size) = args.queue_size {
            job = job.with_queue_size(queue_size);
        }
        if let Some(failures) = args.failures {
            job = job.with_failure_report(failures)?;
        }

        job.digest = args.digest;
        job.format = args.format;
        job.chunk_size = args.chunk_size;
        job.show_progress = !args.quiet;
        job.verbose = args.verbose;

        job.validate()?;
        Ok(job)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::InvalidConcurrency {
                count: self.concurrency,
                max: MAX_CONCURRENCY,
            });
        }

        if self.queue_size < MIN_QUEUE_SIZE {
            return Err(ConfigError::InvalidQueueSize {
                size: self.queue_size,
                min: MIN_QUEUE_SIZE,
            });
        }

        if self.chunk_size < MIN_CHUNK_SIZE || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::InvalidChunkSize {
                size: self.chunk_size,
                min: MIN_CHUNK_SIZE,
                max: MAX_CHUNK_SIZE,
            });
        }

        if self.output.is_dir() {
            return Err(ConfigError::InvalidOutputPath {
                path: self.output.clone(),
                reason: "Output path is a directory".to_string(),
            });
        }

        Ok(())
    }

    /// Digester for the configured algorithm
    pub fn digester(&self) -> Arc<dyn Digester> {
        match self.digest {
            DigestAlgorithm::Md5 => Arc::new(Md5Digester::new(self.chunk_size)),
        }
    }
}

/// Resolve an output path against the working directory, canonicalizing its parent
fn absolute_output(path: &Path) -> Result<PathBuf, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidOutputPath {
        path: path.to_path_buf(),
        reason,
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| invalid("Output path has no file name".to_string()))?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => env::current_dir().map_err(|e| invalid(e.to_string()))?,
    };

    if !parent.is_dir() {
        return Err(invalid(format!(
            "Parent directory '{}' does not exist",
            parent.display()
        )));
    }

    let parent = parent
        .canonicalize()
        .map_err(|e| invalid(e.to_string()))?;
    Ok(parent.join(file_name))
}
