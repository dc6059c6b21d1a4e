//! Post-order snapshot traversal
//!
//! [`SnapshotWalker`] visits a tree depth-first and yields one
//! [`PathRecord`] per entry it does not ignore, every child before its
//! parent and the scan root last. It is a plain [`Iterator`]: records are
//! produced one at a time as the caller pulls them, so output can be
//! streamed while the walk goes on.
//!
//! ## Per entry
//!
//! 1. An entry named [`STORAGE_DIR_NAME`] is skipped outright, whatever the
//!    ignore rules say, so a scan never walks into its own history.
//! 2. The entry is classified without following links: symbolic link,
//!    directory or regular file. Anything else fails the walk.
//! 3. Its snapshot path is computed: `.` for the base directory, the
//!    `/`-separated base-relative path otherwise.
//! 4. Ignored entries contribute nothing, to the output or to their parent.
//! 5. Directories list their children, sort them by name in canonical order
//!    and visit them; their own record is built from the included children
//!    once the last one is done.
//! 6. Files get a digest, fresh or reused from the prior snapshot.
//! 7. Symbolic links carry their target text.
//!
//! ## Failure
//!
//! The first error ends the walk: it is yielded once, and the iterator is
//! exhausted afterwards. There is no skip-and-continue. Names that are not
//! valid UTF-8 are such an error, since snapshot paths are text.
//!
//! ## Resources
//!
//! Each directory is listed in one go when it is entered and its handle is
//! released before any child is visited. Memory grows with the depth of the
//! tree (one frame per open directory), not with its size.
//!
//! ```rust,no_run
//! use treestat::{IgnoreMatcher, PriorSnapshot, SnapshotWalker};
//!
//! # fn main() -> treestat::Result<()> {
//! let matcher = IgnoreMatcher::new().with_patterns(["*.tmp"]);
//! let prior = PriorSnapshot::default();
//! for record in SnapshotWalker::new("./project", &matcher, &prior, true)? {
//!     println!("{}", record?);
//! }
//! # Ok(())
//! # }
//! ```

use crate::digest::{ContentDigest, DirectoryDigest};
use crate::error::{Result, StatError};
use crate::ignore::IgnoreMatcher;
use crate::ordering::{compare_path, ROOT_PATH};
use crate::snapshot::PriorSnapshot;
use crate::storage::STORAGE_DIR_NAME;
use crate::types::{Entry, PathKind, PathRecord};
use crate::utils::{absolute_path, make_relative, to_slash, Attributes};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Counters gathered while walking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Regular files emitted
    pub files: usize,
    /// Directories emitted
    pub directories: usize,
    /// Symbolic links emitted
    pub symlinks: usize,
    /// Entries left out by ignore rules or the storage-directory guard
    pub skipped: usize,
}

/// Outcome of visiting one filesystem entry
enum Visit {
    /// Not part of the snapshot
    Skipped,
    /// A directory was entered; its record comes after its children
    Descended,
    /// A leaf record, ready to emit
    Leaf(PathRecord),
}

/// An entered directory waiting for its children
struct DirectoryFrame {
    relative: String,
    attributes: Attributes,
    children: std::vec::IntoIter<PathBuf>,
    digest: DirectoryDigest,
}

/// Lazy, post-order, ignore-aware filesystem traversal
pub struct SnapshotWalker<'a> {
    base: PathBuf,
    matcher: &'a IgnoreMatcher,
    digest: ContentDigest<'a>,
    pending_root: Option<PathBuf>,
    stack: Vec<DirectoryFrame>,
    stats: WalkStats,
    finished: bool,
}

impl<'a> SnapshotWalker<'a> {
    /// Walk `root`
    ///
    /// When `root` is a directory it is also the base directory and its
    /// record has path `.`; otherwise the base directory is its parent and
    /// the walk yields a single record named after it.
    ///
    /// # Errors
    ///
    /// - [`StatError::Io`] if the current directory is needed and unavailable
    pub fn new(
        root: impl AsRef<Path>,
        matcher: &'a IgnoreMatcher,
        prior: &'a PriorSnapshot,
        hashing: bool,
    ) -> Result<Self> {
        let root = absolute_path(root.as_ref())?;
        let base = base_directory(&root);
        Ok(Self::with_base(base, root, matcher, prior, hashing))
    }

    /// Walk `root` with an explicit base directory (both absolute)
    pub fn with_base(
        base: PathBuf,
        root: PathBuf,
        matcher: &'a IgnoreMatcher,
        prior: &'a PriorSnapshot,
        hashing: bool,
    ) -> Self {
        debug!("Walking {:?} (base {:?}, hashing: {})", root, base, hashing);
        Self {
            base,
            matcher,
            digest: ContentDigest::new(prior, hashing),
            pending_root: Some(root),
            stack: Vec::new(),
            stats: WalkStats::default(),
            finished: false,
        }
    }

    /// Base directory snapshot paths are relative to
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Counters so far
    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    fn advance(&mut self) -> Result<Option<PathRecord>> {
        loop {
            let path = match self.pending_root.take() {
                Some(root) => root,
                None => {
                    let next_child = match self.stack.last_mut() {
                        Some(frame) => frame.children.next(),
                        None => return Ok(None),
                    };
                    match next_child {
                        Some(child) => child,
                        None => match self.stack.pop() {
                            Some(frame) => {
                                let record = self.close_directory(frame);
                                return Ok(Some(self.emit(record)));
                            }
                            None => return Ok(None),
                        },
                    }
                }
            };

            match self.visit(&path)? {
                Visit::Skipped => self.stats.skipped += 1,
                Visit::Descended => {}
                Visit::Leaf(record) => return Ok(Some(self.emit(record))),
            }
        }
    }

    fn visit(&mut self, path: &Path) -> Result<Visit> {
        if path.file_name().is_some_and(|name| name == STORAGE_DIR_NAME) {
            trace!("Skipping storage directory {:?}", path);
            return Ok(Visit::Skipped);
        }

        let (kind, metadata) = classify(path)?;
        let relative = if path == self.base {
            ROOT_PATH.to_string()
        } else {
            make_relative(path, &self.base)?
        };
        if self.matcher.ignore(path, &relative) {
            return Ok(Visit::Skipped);
        }

        let attributes = Attributes::from_metadata(&metadata)?;
        trace!("Visiting {} ({})", relative, kind);
        match kind {
            PathKind::Directory => {
                let children = list_children(path)?;
                self.stack.push(DirectoryFrame {
                    relative,
                    attributes,
                    children: children.into_iter(),
                    digest: DirectoryDigest::new(),
                });
                Ok(Visit::Descended)
            }
            PathKind::File => {
                let digest = self.digest.file_digest(
                    path,
                    &relative,
                    attributes.size,
                    &attributes.modified,
                )?;
                Ok(Visit::Leaf(leaf_record(relative, Entry::File { digest }, attributes)))
            }
            PathKind::SymbolicLink => {
                let target = to_slash(&fs::read_link(path)?)?;
                Ok(Visit::Leaf(leaf_record(relative, Entry::SymbolicLink { target }, attributes)))
            }
        }
    }

    fn close_directory(&self, frame: DirectoryFrame) -> PathRecord {
        PathRecord {
            path: frame.relative,
            entry: self.digest.directory_entry(&frame.digest),
            size: frame.digest.size(),
            owner: frame.attributes.owner,
            group: frame.attributes.group,
            permissions: frame.attributes.permissions,
            modified: frame.attributes.modified,
        }
    }

    fn emit(&mut self, record: PathRecord) -> PathRecord {
        match record.kind() {
            PathKind::File => self.stats.files += 1,
            PathKind::Directory => self.stats.directories += 1,
            PathKind::SymbolicLink => self.stats.symlinks += 1,
        }
        if let Some(parent) = self.stack.last_mut() {
            parent.digest.push(&record);
        }
        record
    }
}

impl Iterator for SnapshotWalker<'_> {
    type Item = Result<PathRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.advance() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                self.stack.clear();
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for SnapshotWalker<'_> {}

/// Base directory for a scan of `root`
pub fn base_directory(root: &Path) -> PathBuf {
    if root.is_dir() {
        return root.to_path_buf();
    }
    root.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf())
}

/// Classify an entry without following symbolic links
///
/// # Errors
///
/// - [`StatError::FileNotFound`] if nothing exists at `path`
/// - [`StatError::UnsupportedFileType`] for fifos, sockets, devices...
/// - [`StatError::Io`] for any other metadata failure
pub fn classify(path: &Path) -> Result<(PathKind, fs::Metadata)> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StatError::FileNotFound { path: path.to_path_buf() });
        }
        Err(e) => return Err(e.into()),
    };

    let file_type = metadata.file_type();
    let kind = if file_type.is_symlink() {
        PathKind::SymbolicLink
    } else if file_type.is_dir() {
        PathKind::Directory
    } else if file_type.is_file() {
        PathKind::File
    } else {
        return Err(StatError::UnsupportedFileType { path: path.to_path_buf() });
    };
    Ok((kind, metadata))
}

/// Children of a directory, sorted by name in canonical order
///
/// Fails on the first name that is not valid UTF-8.
fn list_children(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry
            .file_name()
            .into_string()
            .map_err(|_| StatError::InvalidPathEncoding { path: entry.path() })?;
        children.push((name, entry.path()));
    }
    children.sort_by(|(a, _), (b, _)| compare_path(a, b));
    Ok(children.into_iter().map(|(_, path)| path).collect())
}

fn leaf_record(path: String, entry: Entry, attributes: Attributes) -> PathRecord {
    PathRecord {
        path,
        entry,
        size: attributes.size,
        owner: attributes.owner,
        group: attributes.group,
        permissions: attributes.permissions,
        modified: attributes.modified,
    }
}
