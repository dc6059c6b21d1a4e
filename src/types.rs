//! Core data types used throughout the treestat library
//!
//! ## Overview
//!
//! A scan produces one [`PathRecord`] per filesystem object it visits and
//! does not ignore. A record is an immutable attribute tuple; its last
//! attribute, the fingerprint, means different things depending on the kind
//! of object, so it lives inside the kind-discriminated [`Entry`] payload:
//!
//! - files carry the hex digest of their content,
//! - directories carry the digest of their children's fingerprints,
//! - symbolic links carry their (normalized) target text, not a digest.
//!
//! ## Line format
//!
//! Records are stored one per line, as 8 `|`-separated fields:
//!
//! ```text
//! path|kind|size|owner|group|permissions|modifiedTime|fingerprint
//! ```
//!
//! The delimiter is not escaped inside field values.
//!
//! ```rust
//! use treestat::types::{PathKind, PathRecord};
//!
//! let line = "src/main.rs|f|12|alice|staff|rw-r--r--|2024-01-02T03:04:05Z|0123abcd";
//! let record: PathRecord = line.parse().unwrap();
//! assert_eq!(record.kind(), PathKind::File);
//! assert_eq!(record.size, 12);
//! assert_eq!(record.to_string(), line);
//! ```

use crate::error::{Result, StatError};
use std::fmt;
use std::str::FromStr;

/// Field delimiter of the snapshot line format
pub const FIELD_SEPARATOR: char = '|';

/// Number of fields in a snapshot line
pub const FIELD_COUNT: usize = 8;

/// Kind of filesystem object a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link (never followed)
    SymbolicLink,
}

impl PathKind {
    /// Single-letter code used in the line format
    pub fn code(self) -> &'static str {
        match self {
            PathKind::File => "f",
            PathKind::Directory => "d",
            PathKind::SymbolicLink => "l",
        }
    }

    /// Parse a single-letter kind code
    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "f" => Ok(PathKind::File),
            "d" => Ok(PathKind::Directory),
            "l" => Ok(PathKind::SymbolicLink),
            other => Err(StatError::InvalidKindCode(other.to_string())),
        }
    }
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Kind of a record together with its fingerprint payload
///
/// An empty digest means hashing was disabled when the record was produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Entry {
    /// Regular file with the hex digest of its content
    File {
        /// Content digest
        digest: String,
    },
    /// Directory with the digest of its included children's fingerprints
    Directory {
        /// Aggregated digest
        digest: String,
    },
    /// Symbolic link with its target text
    SymbolicLink {
        /// Link target, separators normalized to `/`
        target: String,
    },
}

impl Entry {
    /// Build an entry from a kind and the raw fingerprint field
    pub fn from_parts(kind: PathKind, fingerprint: impl Into<String>) -> Self {
        let fingerprint = fingerprint.into();
        match kind {
            PathKind::File => Entry::File { digest: fingerprint },
            PathKind::Directory => Entry::Directory { digest: fingerprint },
            PathKind::SymbolicLink => Entry::SymbolicLink { target: fingerprint },
        }
    }

    /// Kind of this entry
    pub fn kind(&self) -> PathKind {
        match self {
            Entry::File { .. } => PathKind::File,
            Entry::Directory { .. } => PathKind::Directory,
            Entry::SymbolicLink { .. } => PathKind::SymbolicLink,
        }
    }

    /// Raw text of the fingerprint field
    pub fn fingerprint(&self) -> &str {
        match self {
            Entry::File { digest } | Entry::Directory { digest } => digest,
            Entry::SymbolicLink { target } => target,
        }
    }

    /// Content digest, for files and directories only
    pub fn digest(&self) -> Option<&str> {
        match self {
            Entry::File { digest } | Entry::Directory { digest } => Some(digest),
            Entry::SymbolicLink { .. } => None,
        }
    }

    /// Link target, for symbolic links only
    pub fn link_target(&self) -> Option<&str> {
        match self {
            Entry::SymbolicLink { target } => Some(target),
            _ => None,
        }
    }
}

/// Attributes recorded for one filesystem object
///
/// Records are values: they are built once, fully, and never changed. For a
/// directory the walker only builds the record after all children are known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathRecord {
    /// Base-relative path with `/` separators, `.` for the base directory
    pub path: String,
    /// Kind and fingerprint
    pub entry: Entry,
    /// Raw size for files and links; sum of included children for directories
    pub size: u64,
    /// Owner account name
    pub owner: String,
    /// Group account name
    pub group: String,
    /// Permission bits rendered as `rwxr-xr-x`
    pub permissions: String,
    /// Content modification time, ISO-8601 text
    pub modified: String,
}

impl PathRecord {
    /// Kind of the recorded object
    pub fn kind(&self) -> PathKind {
        self.entry.kind()
    }

    /// Raw fingerprint field (digest or link target)
    pub fn fingerprint(&self) -> &str {
        self.entry.fingerprint()
    }

    /// Render the record as a snapshot line (no trailing newline)
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    /// Parse a snapshot line
    ///
    /// # Errors
    ///
    /// - [`StatError::InvalidFormat`] if the line does not have exactly 8
    ///   fields or the size is not an unsigned integer
    /// - [`StatError::InvalidKindCode`] if the kind is not `f`, `d` or `l`
    pub fn deserialize(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() != FIELD_COUNT {
            return Err(StatError::invalid_format(
                line,
                format!("expected {} fields, found {}", FIELD_COUNT, fields.len()),
            ));
        }
        let kind = PathKind::from_code(fields[1])?;
        let size = fields[2]
            .parse::<u64>()
            .map_err(|e| StatError::invalid_format(line, format!("bad size {:?}: {}", fields[2], e)))?;

        Ok(Self {
            path: fields[0].to_string(),
            entry: Entry::from_parts(kind, fields[7]),
            size,
            owner: fields[3].to_string(),
            group: fields[4].to_string(),
            permissions: fields[5].to_string(),
            modified: fields[6].to_string(),
        })
    }
}

impl fmt::Display for PathRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.path,
            self.kind(),
            self.size,
            self.owner,
            self.group,
            self.permissions,
            self.modified,
            self.fingerprint()
        )
    }
}

impl FromStr for PathRecord {
    type Err = StatError;

    fn from_str(line: &str) -> Result<Self> {
        Self::deserialize(line)
    }
}
