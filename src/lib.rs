//! tree-digest - Parallel File Digest Scanner
//!
//! Walks a directory tree, computes a content digest and metadata for every
//! regular file, and writes a single CSV summary. Useful for auditing,
//! duplicate discovery and integrity baselines over large file collections.
//!
//! # Features
//!
//! - **Parallel Hashing**: A fixed pool of worker threads digests files while
//!   the walker is still listing directories.
//!
//! - **Memory Bounded**: Files are streamed in fixed-size chunks and the task
//!   queue applies backpressure, so memory use does not grow with tree size.
//!
//! - **Failure Isolation**: Unreadable or vanished files are reported per
//!   path and never abort the run.
//!
//! - **Shard Merge**: Each worker writes its own shard; shards are merged into
//!   the output atomically once every task is done.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Directory Tree                             │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ read_dir (no symlink following)
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Walker ──► bounded queue ──► Worker threads (stat + MD5)       │
//! │                                   │                              │
//! │                                   ▼                              │
//! │                          one shard per worker                    │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ barrier, then merge
//!                               ▼
//!                    ┌──────────────────┐
//!                    │  files_md5.csv   │
//!                    └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Scan the current directory
//! tree-digest
//!
//! # Scan a tree with 16 workers
//! tree-digest --scan /data -c 16 -o data_md5.csv
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod output;
pub mod progress;
pub mod record;
pub mod report;
pub mod walker;

pub use config::{CliArgs, DigestAlgorithm, OutputFormat, ScanJob};
pub use error::{FileError, Result, ScanError};
pub use record::{FileFailure, FileRecord, HEADER};
pub use report::{ScanReporter, TracingReporter};
pub use walker::{RunState, RunSummary, ScanCoordinator, ScanProgress};
