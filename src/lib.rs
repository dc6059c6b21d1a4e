//! # treestat - Directory statistics snapshots
//!
//! Scans a file or directory tree into a flat list of path records, one per
//! line, and compares the scan against the previous one saved next to the
//! scanned tree.
//!
//! ## Overview
//!
//! Each scan yields one record per included path, children before their
//! parent directory, in a fixed canonical order:
//!
//! ```text
//! src/lib.rs|f|2048|alice|staff|rw-r--r--|2024-03-05T07:08:09.01Z|3f786850e387550fdab836ed7e6dc881de23001b
//! src|d|2048|alice|staff|rwxr-xr-x|2024-03-05T07:08:09Z|89e6c98d92887913cadf06b2adb97f26cde4849b
//! .|d|2048|alice|staff|rwxr-xr-x|2024-03-05T07:08:09Z|0b5b1ee5a0c3e3f5b3a4a6c5c1e2e0f2b2e3f4a5
//! ```
//!
//! The fields are path, kind (`f`, `d`, `l`), size, owner, group,
//! permissions, modification time and fingerprint. A file's fingerprint is
//! the SHA-1 of its content, a directory's is the SHA-1 of its children's
//! fingerprints, and a link's is its target.
//!
//! Scans can be saved into the storage directory (`.directory-stats` by
//! default). The most recent saved scan is the *prior snapshot* of the next
//! run: unchanged files reuse its digests, and diff mode reports what was
//! added, deleted or modified since.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use treestat::{ColorMode, OutputMode, StatsBuilder};
//!
//! # fn main() -> treestat::Result<()> {
//! // Save a first snapshot
//! StatsBuilder::new()
//!     .target("./project")
//!     .save(true)
//!     .build()?
//!     .run(std::io::stdout().lock())?;
//!
//! // Later: what changed?
//! let summary = StatsBuilder::new()
//!     .target("./project")
//!     .mode(OutputMode::Diff)
//!     .color(ColorMode::Always)
//!     .build()?
//!     .run(std::io::stdout().lock())?;
//! if let Some(changes) = summary.changes {
//!     println!("{} changes", changes.total_changes());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Walking without a run
//!
//! The lower-level pieces compose directly:
//!
//! ```rust,no_run
//! use treestat::{IgnoreMatcher, PriorSnapshot, SnapshotWalker};
//!
//! # fn main() -> treestat::Result<()> {
//! let matcher = IgnoreMatcher::new().with_patterns(["target", "*.o"]);
//! let prior = PriorSnapshot::default();
//! for record in SnapshotWalker::new(".", &matcher, &prior, true)? {
//!     println!("{}", record?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Ignore rules
//!
//! - `name` ignores the path whose base-relative path is exactly `name`
//! - `*suffix` ignores every path ending with `suffix`
//! - `(?sibling:marker)name` ignores entries named `name` that have a
//!   sibling named `marker`, e.g. `(?sibling:Cargo.toml)target`
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`](Result), with [`StatError`] telling
//! apart I/O failures, unsupported file types and malformed snapshot lines.
//! A failed walk stops at the first error; nothing is saved.
//!
//! ## Module Organization
//!
//! - [`types`]: path records and their line format
//! - [`ordering`]: canonical path order
//! - [`ignore`]: ignore rules
//! - [`digest`]: content fingerprints and reuse of prior ones
//! - [`walker`]: post-order traversal
//! - [`snapshot`]: prior snapshot lookup
//! - [`storage`]: the storage directory
//! - [`report`]: raw and diff output
//! - [`stats`]: run orchestration
//! - [`error`]: error types

pub mod digest;
pub mod error;
pub mod ignore;
pub mod ordering;
pub mod report;
pub mod snapshot;
pub mod stats;
pub mod storage;
pub mod types;
pub mod utils;
pub mod walker;

mod collections;

pub use digest::{ContentDigest, DirectoryDigest, EMPTY_DIGEST};
pub use error::{Result, StatError};
pub use ignore::{IgnoreMatcher, IgnoreRule};
pub use ordering::{compare_path, ROOT_PATH};
pub use report::{
    Change, ChangeStats, ColorMode, DiffReporter, RawPrinter, RecordSink, SnapshotDiff,
};
pub use snapshot::PriorSnapshot;
pub use stats::{OutputMode, RunSummary, StatOptions, Stats, StatsBuilder};
pub use storage::{SnapshotStore, SnapshotWriter, STORAGE_DIR_NAME};
pub use types::{Entry, PathKind, PathRecord};
pub use walker::{SnapshotWalker, WalkStats};
