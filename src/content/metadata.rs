//! File metadata reading and timestamp formatting

use chrono::{DateTime, Local};
use std::fs::Metadata;
use std::time::SystemTime;

/// Timestamp format used in output rows
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Size and timestamps for one regular file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// File size in bytes
    pub size: u64,

    /// Last modification time
    pub modified: SystemTime,

    /// Creation time (birth time, or inode change time where unsupported)
    pub created: SystemTime,
}

impl FileMetadata {
    /// Build from `std::fs::Metadata`
    ///
    /// Returns `None` if the metadata does not describe a regular file.
    pub fn from_std(meta: &Metadata) -> Option<Self> {
        if !meta.is_file() {
            return None;
        }

        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let created = meta
            .created()
            .ok()
            .or_else(|| change_time(meta))
            .unwrap_or(modified);

        Some(Self {
            size: meta.len(),
            modified,
            created,
        })
    }
}

#[cfg(unix)]
fn change_time(meta: &Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::Duration;

    let secs = u64::try_from(meta.ctime()).ok()?;
    let nanos = u32::try_from(meta.ctime_nsec()).unwrap_or(0);
    SystemTime::UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn change_time(_meta: &Metadata) -> Option<SystemTime> {
    None
}

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS` in local time
pub fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_format_timestamp_layout() {
        let formatted = format_timestamp(SystemTime::now());
        assert_eq!(formatted.len(), 19);
        assert!(NaiveDateTime::parse_from_str(&formatted, TIME_FORMAT).is_ok());
    }

    #[test]
    fn test_format_timestamp_local() {
        let naive = NaiveDateTime::parse_from_str("2021-03-04 05:06:07", TIME_FORMAT).unwrap();
        let local = Local.from_local_datetime(&naive).earliest().unwrap();
        let system: SystemTime = local.into();
        assert_eq!(format_timestamp(system), "2021-03-04 05:06:07");
    }

    #[test]
    fn test_regular_file_metadata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, b"hello").unwrap();

        let meta = FileMetadata::from_std(&fs::metadata(&path).unwrap()).unwrap();
        assert_eq!(meta.size, 5);
    }

    #[test]
    fn test_directory_is_not_regular() {
        let dir = tempdir().unwrap();
        assert!(FileMetadata::from_std(&fs::metadata(dir.path()).unwrap()).is_none());
    }
}
