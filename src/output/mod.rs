//! Result output: per-worker shards and the final merge
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  ┌──────────┐         ┌──────────┐
//! │ Worker 0 │  │ Worker 1 │   ...   │ Worker N │
//! └────┬─────┘  └────┬─────┘         └────┬─────┘
//!      │ rows        │ rows               │ rows
//!      ▼             ▼                    ▼
//!  out__digest-0  out__digest-1  ...  out__digest-N
//!      │             │                    │
//!      └─────────────┼────────────────────┘
//!                    ▼  (after all workers joined)
//!          ┌────────────────────┐
//!          │  merge_shards      │
//!          │  header + shards   │
//!          │  temp file, rename │
//!          └─────────┬──────────┘
//!                    ▼
//!                 output.csv
//! ```

pub mod merge;
pub mod shard;

pub use merge::{merge_shards, remove_shards, MergeStats};
pub use shard::{shard_path, ShardInfo, ShardWriter, SHARD_SEP};
