//! Content analysis: streaming digests and file metadata
//!
//! This module provides:
//! - The [`Digester`] capability and its MD5 implementation
//! - Size and timestamp reading for regular files

pub mod checksum;
pub mod metadata;

pub use checksum::{compute_md5, Digester, Md5Digester, DEFAULT_CHUNK_SIZE};
pub use metadata::{format_timestamp, FileMetadata, TIME_FORMAT};
