//! Streaming content digests
//!
//! Files are hashed by reading them in fixed-size chunks, so peak memory per
//! file is bounded by the chunk size rather than the file size. The digest
//! algorithm sits behind the [`Digester`] trait; MD5 is the only
//! implementation shipped.

use md5::{Digest, Md5};
use std::io::{self, Read};

/// Default read chunk size (4 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024;

/// Computes a digest over a byte stream
pub trait Digester: Send + Sync {
    /// Short algorithm name, e.g. "md5"
    fn name(&self) -> &'static str;

    /// Consume the reader to EOF and return the lowercase hex digest
    ///
    /// Returns the digest together with the number of bytes read.
    fn digest_reader(&self, reader: &mut dyn Read) -> io::Result<(String, u64)>;
}

/// MD5 digest over chunked reads
#[derive(Debug, Clone)]
pub struct Md5Digester {
    chunk_size: usize,
}

impl Md5Digester {
    /// Create a digester that reads `chunk_size` bytes at a time
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Read chunk size in bytes
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Default for Md5Digester {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl Digester for Md5Digester {
    fn name(&self) -> &'static str {
        "md5"
    }

    fn digest_reader(&self, reader: &mut dyn Read) -> io::Result<(String, u64)> {
        let mut hasher = Md5::new();
        let mut buf = vec![0u8; self.chunk_size];
        let mut total = 0u64;

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buf[..n]);
            total += n as u64;
        }

        Ok((format!("{:x}", hasher.finalize()), total))
    }
}

/// Compute an MD5 digest for an in-memory buffer
///
/// # Example
///
/// ```
/// use tree_digest::content::checksum::compute_md5;
///
/// assert_eq!(compute_md5(b""), "d41d8cd98f00b204e9800998ecf8427e");
/// ```
pub fn compute_md5(content: &[u8]) -> String {
    format!("{:x}", Md5::digest(content))
}
