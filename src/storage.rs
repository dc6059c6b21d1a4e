//! Snapshot storage directory
//!
//! Saved scans live in a storage directory, by default `.directory-stats`
//! inside the scanned base directory:
//!
//! ```text
//! .directory-stats/
//! ├── ignore                          # optional, one ignore pattern per line
//! ├── stat-2024.03.05-07h08m09s010    # one saved scan per file
//! └── stat-2024.03.06-18h00m00s000
//! ```
//!
//! Snapshot names encode the UTC creation time with fixed-width, zero-padded
//! fields, so the lexicographically greatest name is also the most recent
//! snapshot. Snapshots are written to a temporary file inside the storage
//! directory and only renamed into place once the walk has completed, so an
//! interrupted run never leaves a truncated snapshot behind to be picked up
//! as the latest one.

use crate::error::Result;
use crate::snapshot::PriorSnapshot;
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Default name of the storage directory; entries with this name are never
/// scanned
pub const STORAGE_DIR_NAME: &str = ".directory-stats";

/// Prefix shared by all snapshot file names
pub const SNAPSHOT_PREFIX: &str = "stat-";

/// Name of the ignore-pattern file inside the storage directory
pub const IGNORE_FILE_NAME: &str = "ignore";

const SNAPSHOT_NAME_FORMAT: &str = "stat-%Y.%m.%d-%Hh%Mm%Ss%3f";

/// Access to the saved snapshots of one storage directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Store rooted at `dir` (which may not exist yet)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default store of a base directory
    pub fn for_base(base: &Path) -> Self {
        Self::new(base.join(STORAGE_DIR_NAME))
    }

    /// Location of the storage directory
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// File name of a snapshot created at `at`
    pub fn snapshot_name(at: DateTime<Utc>) -> String {
        at.format(SNAPSHOT_NAME_FORMAT).to_string()
    }

    /// Path a snapshot created at `at` is saved under
    pub fn snapshot_path(&self, at: DateTime<Utc>) -> PathBuf {
        self.dir.join(Self::snapshot_name(at))
    }

    /// Most recent snapshot file, if any
    ///
    /// # Errors
    ///
    /// - [`StatError::Io`](crate::StatError::Io) if the directory cannot be listed
    pub fn latest_snapshot(&self) -> Result<Option<PathBuf>> {
        if !self.dir.is_dir() {
            return Ok(None);
        }
        let mut latest: Option<String> = None;
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.starts_with(SNAPSHOT_PREFIX) && latest.as_deref().map_or(true, |l| name.as_str() > l) {
                latest = Some(name);
            }
        }
        Ok(latest.map(|name| self.dir.join(name)))
    }

    /// Records of the most recent snapshot; empty when there is none
    ///
    /// # Errors
    ///
    /// - [`StatError::Io`](crate::StatError::Io) if the snapshot cannot be read
    /// - [`StatError::SnapshotParse`](crate::StatError::SnapshotParse) on a malformed line
    pub fn load_prior(&self) -> Result<PriorSnapshot> {
        match self.latest_snapshot()? {
            Some(path) => {
                let prior = PriorSnapshot::parse(BufReader::new(File::open(&path)?), &path)?;
                debug!("Loaded {} records from {:?}", prior.len(), path);
                Ok(prior)
            }
            None => {
                debug!("No prior snapshot in {:?}", self.dir);
                Ok(PriorSnapshot::default())
            }
        }
    }

    /// Lines of the `ignore` file; empty when the file does not exist
    ///
    /// # Errors
    ///
    /// - [`StatError::Io`](crate::StatError::Io) if the file exists but cannot be read
    pub fn ignore_patterns(&self) -> Result<Vec<String>> {
        let path = self.dir.join(IGNORE_FILE_NAME);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let patterns: Vec<String> = fs::read_to_string(&path)?.lines().map(str::to_string).collect();
        debug!("Read {} ignore lines from {:?}", patterns.len(), path);
        Ok(patterns)
    }

    /// Start writing a snapshot created at `at`
    ///
    /// Creates the storage directory when missing.
    ///
    /// # Errors
    ///
    /// - [`StatError::Io`](crate::StatError::Io) if the directory or the temporary file cannot be created
    pub fn create_writer(&self, at: DateTime<Utc>) -> Result<SnapshotWriter> {
        fs::create_dir_all(&self.dir)?;
        let temp = NamedTempFile::new_in(&self.dir)?;
        Ok(SnapshotWriter {
            out: BufWriter::new(temp),
            target: self.snapshot_path(at),
        })
    }
}

/// Snapshot being written; becomes visible on [`persist`](Self::persist)
///
/// Dropping a writer without persisting it deletes the temporary file.
#[derive(Debug)]
pub struct SnapshotWriter {
    out: BufWriter<NamedTempFile>,
    target: PathBuf,
}

impl SnapshotWriter {
    /// Final location of the snapshot
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Flush and move the snapshot into place, never replacing an existing one
    ///
    /// # Errors
    ///
    /// - [`StatError::Io`](crate::StatError::Io) if flushing or renaming fails
    pub fn persist(self) -> Result<PathBuf> {
        let temp = self.out.into_inner().map_err(|e| e.into_error())?;
        temp.persist_noclobber(&self.target).map_err(|e| e.error)?;
        debug!("Saved snapshot {:?}", self.target);
        Ok(self.target)
    }
}

impl Write for SnapshotWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.out.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
