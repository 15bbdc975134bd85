//! Merge shards into the final output
//!
//! Runs after every worker has been joined. The header and all shard contents
//! are written to a temporary file in the output directory, which is then
//! renamed over the destination. Shards are removed only after the rename
//! succeeds, so a failed merge never destroys records.

use crate::error::{MergeError, MergeResult};
use crate::record::HEADER;
use crate::report::ScanReporter;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};
use tracing::{info, warn};

/// Outcome of a merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Shards folded in
    pub shards: usize,

    /// Bytes copied from shards (excluding the header)
    pub bytes: u64,
}

/// Write the header plus every shard to `output`, then delete the shards
pub fn merge_shards(
    shards: &[PathBuf],
    output: &Path,
    reporter: &dyn ScanReporter,
) -> MergeResult<MergeStats> {
    // Check up front so a lost shard fails before anything is written
    for shard in shards {
        if !shard.is_file() {
            return Err(MergeError::ShardMissing { path: shard.clone() });
        }
    }

    let output_err = |source: io::Error| MergeError::OutputWrite {
        path: output.to_path_buf(),
        source,
    };

    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = create_temp_output(dir, output).map_err(output_err)?;
    let mut out = BufWriter::new(tmp);

    writeln!(out, "{}", HEADER).map_err(output_err)?;

    let mut stats = MergeStats::default();
    for shard in shards {
        info!(shard = %shard.display(), "Merging shard");
        let bytes = append_shard(shard, &mut out)?;
        reporter.shard_merged(shard, bytes);
        stats.shards += 1;
        stats.bytes += bytes;
    }

    let tmp = out.into_inner().map_err(|e| output_err(e.into_error()))?;
    tmp.as_file().sync_all().map_err(output_err)?;
    tmp.persist(output).map_err(|e| output_err(e.error))?;

    for shard in shards {
        if let Err(e) = fs::remove_file(shard) {
            warn!(shard = %shard.display(), error = %e, "Failed to remove merged shard");
        }
    }

    Ok(stats)
}

/// Temp file that will become `output`
///
/// Takes the mode of an existing output, otherwise the mode a plain
/// `File::create` would give (0666 minus umask) instead of tempfile's 0600.
fn create_temp_output(dir: &Path, output: &Path) -> io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    builder.prefix(".tree-digest-").suffix(".tmp");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }

    let tmp = builder.tempfile_in(dir)?;
    if let Ok(existing) = fs::metadata(output) {
        tmp.as_file().set_permissions(existing.permissions())?;
    }
    Ok(tmp)
}

fn append_shard<W: Write>(shard: &Path, out: &mut W) -> MergeResult<u64> {
    let mut file = File::open(shard).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => MergeError::ShardMissing {
            path: shard.to_path_buf(),
        },
        _ => MergeError::ShardUnreadable {
            path: shard.to_path_buf(),
            source: e,
        },
    })?;

    io::copy(&mut file, out).map_err(|e| MergeError::ShardUnreadable {
        path: shard.to_path_buf(),
        source: e,
    })
}

/// Remove shards left behind by a failed run
pub fn remove_shards(shards: &[PathBuf]) {
    for shard in shards {
        match fs::remove_file(shard) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(shard = %shard.display(), error = %e, "Failed to remove shard"),
        }
    }
}
