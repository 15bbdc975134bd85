//! Parallel scan-and-digest pipeline
//!
//! # Architecture
//!
//! ```text
//!                 ┌─────────────────────────────┐
//!                 │       ScanCoordinator       │
//!                 │  - Walker (iterative stack) │
//!                 │  - submits one task / file  │
//!                 └──────────────┬──────────────┘
//!                                │ bounded queue (backpressure)
//!       ┌────────────────────────┼────────────────────────┐
//!       │                        │                        │
//! ┌─────▼─────┐            ┌─────▼─────┐            ┌─────▼─────┐
//! │ Worker 0  │            │ Worker 1  │            │ Worker N  │
//! │ stat+hash │            │ stat+hash │            │ stat+hash │
//! │ shard 0   │            │ shard 1   │            │ shard N   │
//! └───────────┘            └───────────┘            └───────────┘
//!                                │ join (barrier)
//!                                ▼
//!                          merge_shards
//! ```

pub mod coordinator;
pub mod queue;
pub mod tree;
pub mod worker;

pub use coordinator::{RunState, RunStatus, RunSummary, ScanCoordinator, ScanProgress};
pub use queue::{FileTask, WorkQueue};
pub use tree::{WalkStats, Walker};
pub use worker::{process_file, ScanCounters, Worker, WorkerContext, WorkerOutput};
