//! Content fingerprints
//!
//! Files are fingerprinted with the SHA-1 digest of their content, rendered
//! as 40 lowercase hex characters. Directories are fingerprinted with the
//! SHA-1 of the concatenation (no separator) of their included children's
//! fingerprints, children taken in canonical path order. An empty directory
//! therefore gets the digest of the empty string.
//!
//! ## Reuse of prior fingerprints
//!
//! Re-reading every file on every scan is the expensive part of a run. When
//! the prior snapshot holds a file at the same path with the same size and
//! modification time, and a non-empty digest, that digest is taken as is.
//! This trusts metadata equality as a stand-in for content equality and
//! does not re-validate anything: a snapshot edited to hold a wrong digest
//! keeps propagating it until the file's size or modification time changes.
//!
//! ## Disabled hashing
//!
//! With hashing off every file digest is empty, and directory aggregation is
//! skipped altogether: directory digests are empty too, not the digest of
//! the (empty) concatenation.

use crate::error::Result;
use crate::snapshot::PriorSnapshot;
use crate::types::{Entry, PathKind, PathRecord};
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::trace;

/// Read buffer size for streaming file digests
const CHUNK_SIZE: usize = 8192;

/// Digest of the empty string, the fingerprint of an empty directory
pub const EMPTY_DIGEST: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";

/// Digest of a file's content, streamed in fixed-size chunks
///
/// # Errors
///
/// - [`StatError::Io`](crate::StatError::Io) if the file cannot be opened or read
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Digest of an in-memory byte sequence
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Incremental directory fingerprint
///
/// Children must be pushed in canonical path order; the walker guarantees
/// this by visiting children sorted by name. Fingerprints are fed to the
/// hasher as they arrive, so a wide directory costs no more memory than a
/// narrow one.
#[derive(Debug, Clone, Default)]
pub struct DirectoryDigest {
    hasher: Sha1,
    size: u64,
}

impl DirectoryDigest {
    /// Start an empty aggregation
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one included child
    pub fn push(&mut self, child: &PathRecord) {
        self.size += child.size;
        self.hasher.update(child.fingerprint().as_bytes());
    }

    /// Sum of the children's sizes so far
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Final digest; empty when hashing is disabled
    pub fn finish(&self, hashing: bool) -> String {
        if hashing {
            hex::encode(self.hasher.clone().finalize())
        } else {
            String::new()
        }
    }
}

/// Fingerprint of a list of children already in canonical order
pub fn aggregate<'a, I>(children: I) -> String
where
    I: IntoIterator<Item = &'a PathRecord>,
{
    let mut digest = DirectoryDigest::new();
    for child in children {
        digest.push(child);
    }
    digest.finish(true)
}

/// Decides, per file, between a fresh digest and one taken from the prior
/// snapshot
#[derive(Debug, Clone, Copy)]
pub struct ContentDigest<'a> {
    prior: &'a PriorSnapshot,
    hashing: bool,
}

impl<'a> ContentDigest<'a> {
    /// Create a digester backed by the prior snapshot
    pub fn new(prior: &'a PriorSnapshot, hashing: bool) -> Self {
        Self { prior, hashing }
    }

    /// Whether hashing is enabled for this run
    pub fn hashing(&self) -> bool {
        self.hashing
    }

    /// Prior digest usable for this file, if the reuse policy allows it
    pub fn reusable(&self, relative_path: &str, size: u64, modified: &str) -> Option<&'a str> {
        let prior = self.prior.get(relative_path)?;
        match &prior.entry {
            Entry::File { digest }
                if !digest.is_empty() && prior.size == size && prior.modified == modified =>
            {
                Some(digest.as_str())
            }
            _ => None,
        }
    }

    /// Fingerprint of a regular file
    ///
    /// # Errors
    ///
    /// - [`StatError::Io`](crate::StatError::Io) if the content has to be read and cannot be
    pub fn file_digest(
        &self,
        absolute_path: &Path,
        relative_path: &str,
        size: u64,
        modified: &str,
    ) -> Result<String> {
        if !self.hashing {
            return Ok(String::new());
        }
        if let Some(digest) = self.reusable(relative_path, size, modified) {
            trace!("Reusing prior digest for {}", relative_path);
            return Ok(digest.to_string());
        }
        trace!("Hashing {}", relative_path);
        hash_file(absolute_path)
    }

    /// Directory entry for the aggregated children
    pub fn directory_entry(&self, children: &DirectoryDigest) -> Entry {
        Entry::from_parts(PathKind::Directory, children.finish(self.hashing))
    }
}
