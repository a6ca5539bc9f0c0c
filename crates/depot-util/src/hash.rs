//! Content hashing for checksum verification (SHA-1, SHA-256, MD5).

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

use crate::errors::DepotError;

/// Supported checksum algorithms, in the order the connector tries them
/// when validating an external checksum sidecar (spec.md §4.H step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Sha256,
    Sha1,
    Md5,
}

impl Algorithm {
    /// File-extension suffix for this algorithm's checksum sidecar
    /// (spec.md §6 "checksums: sibling file with extension appended").
    pub fn extension(&self) -> &'static str {
        match self {
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha1 => "sha1",
            Algorithm::Md5 => "md5",
        }
    }

    /// Default trial order: strongest first.
    pub fn default_order() -> &'static [Algorithm] {
        &[Algorithm::Sha256, Algorithm::Sha1, Algorithm::Md5]
    }

    pub fn digest_hex(&self, data: &[u8]) -> String {
        match self {
            Algorithm::Sha256 => hex_sha256(data),
            Algorithm::Sha1 => hex_sha1(data),
            Algorithm::Md5 => hex_md5(data),
        }
    }
}

pub fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

pub fn hex_sha1(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

pub fn hex_md5(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Compute the SHA-256 hash of a file without loading it fully into memory.
pub fn sha256_file_streaming(path: &Path) -> miette::Result<String> {
    let file = std::fs::File::open(path).map_err(DepotError::Io)?;
    let mut reader = std::io::BufReader::with_capacity(64 * 1024, file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(DepotError::Io)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Extract the hex hash from a checksum sidecar's content.
///
/// Sidecar files may contain just the hash, or `hash  filename`.
pub fn extract_hash(content: &str) -> String {
    content.split_whitespace().next().unwrap_or("").to_string()
}
