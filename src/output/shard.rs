//! Per-worker shard files
//!
//! Each worker owns exactly one shard next to the final output, named
//! `<output>__digest-<id>`. Only that worker writes to it. The shard is
//! flushed and closed once, by [`ShardWriter::finish`] or on drop.

use crate::record::FileRecord;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Separator between the output file name and the shard suffix
pub const SHARD_SEP: &str = "__";

/// Path of the shard owned by worker `id`
pub fn shard_path(output: &Path, id: usize) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{}{}digest-{}", name, SHARD_SEP, id))
}

/// Closed shard handed to the merger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardInfo {
    /// Shard file path
    pub path: PathBuf,

    /// Rows written
    pub rows: u64,
}

/// Exclusive writer for one shard
pub struct ShardWriter {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    rows: u64,
}

impl ShardWriter {
    /// Create (or truncate) the shard file
    pub fn create(path: PathBuf) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            rows: 0,
        })
    }

    /// Shard file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Append one record
    pub fn write_record(&mut self, record: &FileRecord) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "shard already closed"))?;
        record.write_row(writer)?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and close the shard
    pub fn finish(mut self) -> io::Result<ShardInfo> {
        if let Some(writer) = self.writer.take() {
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }

        Ok(ShardInfo {
            path: self.path.clone(),
            rows: self.rows,
        })
    }
}

impl Drop for ShardWriter {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                warn!(shard = %self.path.display(), error = %e, "Failed to flush shard on drop");
            }
        }
    }
}
