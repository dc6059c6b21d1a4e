//! Prior snapshot lookup table
//!
//! The records of the most recently saved scan, keyed by path. The table is
//! loaded once before a walk starts and only read afterwards: the walker
//! consults it for digest reuse and the diff reporter merges against it.

use crate::collections::{HashMap, HashMapExt};
use crate::error::{Result, StatError};
use crate::ordering::compare_path;
use crate::types::PathRecord;
use std::io::BufRead;
use std::path::Path;

/// Immutable mapping from path to the record last saved for it
#[derive(Debug, Clone)]
pub struct PriorSnapshot {
    records: HashMap<String, PathRecord>,
}

impl Default for PriorSnapshot {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
        }
    }
}

impl PriorSnapshot {
    /// Build a snapshot from records; a later record wins over an earlier
    /// one with the same path
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = PathRecord>,
    {
        let mut map = HashMap::new();
        for record in records {
            map.insert(record.path.clone(), record);
        }
        Self { records: map }
    }

    /// Parse snapshot lines from a reader
    ///
    /// `source` only names the input in error messages.
    ///
    /// # Errors
    ///
    /// - [`StatError::Io`] if reading fails
    /// - [`StatError::SnapshotParse`] wrapping the first malformed line
    pub fn parse<R: BufRead>(reader: R, source: &Path) -> Result<Self> {
        let mut records = HashMap::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let record = PathRecord::deserialize(&line).map_err(|e| StatError::SnapshotParse {
                file: source.to_path_buf(),
                line_number: index + 1,
                source: Box::new(e),
            })?;
            records.insert(record.path.clone(), record);
        }
        Ok(Self { records })
    }

    /// Record saved for `path`
    pub fn get(&self, path: &str) -> Option<&PathRecord> {
        self.records.get(path)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no record
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in ascending canonical path order
    pub fn sorted(&self) -> Vec<&PathRecord> {
        let mut sorted: Vec<&PathRecord> = self.records.values().collect();
        sorted.sort_by(|a, b| compare_path(&a.path, &b.path));
        sorted
    }
}
