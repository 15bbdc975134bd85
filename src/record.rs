//! Scan record types and the delimited row format
//!
//! Every scanned file ends in exactly one of these: a [`FileRecord`] written
//! to a shard, or a [`FileFailure`] returned in the run summary.

use crate::content::format_timestamp;
use crate::content::FileMetadata;
use crate::error::FileError;
use std::borrow::Cow;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Header row of the output file (without trailing newline)
pub const HEADER: &str = "abspath,file_dir,file_name,modify_time,create_time,size(B),digest";

/// Field delimiter
pub const DELIMITER: char = ',';

/// One scanned file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path (record identity)
    pub path: PathBuf,

    /// Last modification time
    pub modified: SystemTime,

    /// Creation time
    pub created: SystemTime,

    /// Size in bytes
    pub size: u64,

    /// Lowercase hex digest
    pub digest: String,
}

impl FileRecord {
    /// Build a record from metadata and a computed digest
    pub fn new(path: PathBuf, meta: &FileMetadata, digest: String) -> Self {
        Self {
            path,
            modified: meta.modified,
            created: meta.created,
            size: meta.size,
            digest,
        }
    }

    /// Parent directory of the file
    pub fn file_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Final path component
    pub fn file_name(&self) -> Cow<'_, str> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or(Cow::Borrowed(""))
    }

    /// True if the path is not valid UTF-8 and renders with replacement characters
    pub fn has_lossy_path(&self) -> bool {
        self.path.to_str().is_none()
    }

    /// Render the record as one output line, including the newline
    pub fn to_row(&self) -> String {
        let fields = [
            quote_field(&self.path.to_string_lossy()).into_owned(),
            quote_field(&self.file_dir().to_string_lossy()).into_owned(),
            quote_field(&self.file_name()).into_owned(),
            format_timestamp(self.modified),
            format_timestamp(self.created),
            self.size.to_string(),
            self.digest.clone(),
        ];

        let mut row = fields.join(",");
        row.push('\n');
        row
    }

    /// Write the record as a single line
    ///
    /// The line is rendered first and handed to the writer in one call, so a
    /// buffered writer never holds a partial row from a failed render.
    pub fn write_row<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(self.to_row().as_bytes())
    }
}

/// A file that was discovered but could not be recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    /// Absolute path
    pub path: PathBuf,

    /// What went wrong
    pub error: FileError,
}

impl FileFailure {
    pub fn new(path: PathBuf, error: FileError) -> Self {
        Self { path, error }
    }

    /// Render as `abspath,reason` line for the failure report
    pub fn to_row(&self) -> String {
        format!(
            "{},{}\n",
            quote_field(&self.path.to_string_lossy()),
            quote_field(&self.error.to_string())
        )
    }
}

/// Header row of the failure report
pub const FAILURE_HEADER: &str = "abspath,reason";

/// Quote a field if it contains the delimiter, a quote or a line break
pub fn quote_field(field: &str) -> Cow<'_, str> {
    if field.contains(&[DELIMITER, '"', '\n', '\r'][..]) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Write a failure report file
pub fn write_failure_report(path: &Path, failures: &[FileFailure]) -> io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut out = io::BufWriter::new(file);
    writeln!(out, "{}", FAILURE_HEADER)?;
    for failure in failures {
        out.write_all(failure.to_row().as_bytes())?;
    }
    out.flush()
}
