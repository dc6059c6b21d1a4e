//! Output of a scan: raw records or a diff against the prior snapshot
//!
//! ## Raw mode
//!
//! [`RawPrinter`] writes every record as a snapshot line, which is also
//! what gets saved to a snapshot file.
//!
//! ## Diff mode
//!
//! [`SnapshotDiff`] merges the live post-order stream against the prior
//! snapshot's paths sorted in canonical order (the "pending" list). Both
//! sides are in the same order, so one forward pass classifies every path:
//!
//! - pending paths sorting before the current record were not seen again and
//!   are deletions;
//! - a pending path equal to the current one is compared line to line and is
//!   a modification if anything differs;
//! - otherwise the current record is new.
//!
//! Whatever is still pending when the scan ends has been deleted.
//!
//! [`DiffReporter`] renders those changes as lines:
//!
//! ```text
//! -del- f2|f|3|alice|staff|rw-r--r--|2024-01-01T00:00:00Z|...
//! ~mod~ f3| size 3 -> 6 | modifiedTime ... -> ... | fingerprint ... -> ... |
//! +new+ f4|f|3|alice|staff|rw-r--r--|2024-01-01T00:00:00Z|...
//! ```
//!
//! With [`ColorMode::Always`] each line is wrapped in the escape sequence of
//! its category: green for additions, red for deletions, yellow for
//! modifications.

use crate::error::Result;
use crate::ordering::compare_path;
use crate::snapshot::PriorSnapshot;
use crate::types::PathRecord;
use colored::Color;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;
use std::io::Write;

/// Whether diff lines carry terminal color escapes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Plain text
    #[default]
    Never,
    /// ANSI escape sequence around every diff line
    Always,
}

impl ColorMode {
    /// Wrap a line in the color of its category
    pub fn paint<'a>(self, category: Category, line: &'a str) -> Cow<'a, str> {
        match self {
            ColorMode::Never => Cow::Borrowed(line),
            ColorMode::Always => Cow::Owned(format!(
                "\x1b[{}m{}\x1b[0m",
                category.color().to_fg_str(),
                line
            )),
        }
    }
}

/// Kind of difference found for a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Present now, absent from the prior snapshot
    Added,
    /// Present in the prior snapshot, absent now
    Deleted,
    /// Present in both with different attributes
    Modified,
}

impl Category {
    /// Prefix of the rendered line
    pub fn tag(self) -> &'static str {
        match self {
            Category::Added => "+new+",
            Category::Deleted => "-del-",
            Category::Modified => "~mod~",
        }
    }

    /// Terminal color of the category
    pub fn color(self) -> Color {
        match self {
            Category::Added => Color::Green,
            Category::Deleted => Color::Red,
            Category::Modified => Color::Yellow,
        }
    }
}

/// One attribute that differs between the prior and the current record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeChange {
    /// Attribute name as shown in diff lines
    pub name: &'static str,
    /// Prior value
    pub old: String,
    /// Current value
    pub new: String,
}

/// Attributes that differ between two records of the same path, in record
/// field order
pub fn attribute_changes(prev: &PathRecord, cur: &PathRecord) -> Vec<AttributeChange> {
    let pairs: [(&'static str, String, String); 7] = [
        ("kind", prev.kind().to_string(), cur.kind().to_string()),
        ("size", prev.size.to_string(), cur.size.to_string()),
        ("owner", prev.owner.clone(), cur.owner.clone()),
        ("group", prev.group.clone(), cur.group.clone()),
        ("permissions", prev.permissions.clone(), cur.permissions.clone()),
        ("modifiedTime", prev.modified.clone(), cur.modified.clone()),
        ("fingerprint", prev.fingerprint().to_string(), cur.fingerprint().to_string()),
    ];
    pairs
        .into_iter()
        .filter(|(_, old, new)| old != new)
        .map(|(name, old, new)| AttributeChange { name, old, new })
        .collect()
}

/// A difference between the current scan and the prior snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// New path
    Added(PathRecord),
    /// Path gone since the prior snapshot
    Deleted(PathRecord),
    /// Path whose attributes changed
    Modified {
        /// Path of the record
        path: String,
        /// Differing attributes
        attributes: Vec<AttributeChange>,
    },
}

impl Change {
    /// Category of the change
    pub fn category(&self) -> Category {
        match self {
            Change::Added(_) => Category::Added,
            Change::Deleted(_) => Category::Deleted,
            Change::Modified { .. } => Category::Modified,
        }
    }

    /// Path the change is about
    pub fn path(&self) -> &str {
        match self {
            Change::Added(record) | Change::Deleted(record) => &record.path,
            Change::Modified { path, .. } => path,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Added(record) | Change::Deleted(record) => {
                write!(f, "{} {}", self.category().tag(), record)
            }
            Change::Modified { path, attributes } => {
                write!(f, "{} {}|", self.category().tag(), path)?;
                for change in attributes {
                    write!(f, " {} {} -> {} |", change.name, change.old, change.new)?;
                }
                Ok(())
            }
        }
    }
}

/// Counts of changes found by a diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeStats {
    /// New paths
    pub added: usize,
    /// Deleted paths
    pub deleted: usize,
    /// Modified paths
    pub modified: usize,
    /// Paths found identical
    pub unchanged: usize,
}

impl ChangeStats {
    /// Whether anything changed
    pub fn has_changes(&self) -> bool {
        self.added > 0 || self.deleted > 0 || self.modified > 0
    }

    /// Number of reported changes
    pub fn total_changes(&self) -> usize {
        self.added + self.deleted + self.modified
    }

    fn count(&mut self, change: &Change) {
        match change.category() {
            Category::Added => self.added += 1,
            Category::Deleted => self.deleted += 1,
            Category::Modified => self.modified += 1,
        }
    }
}

/// Sorted-merge diff of a post-order record stream against a prior snapshot
#[derive(Debug)]
pub struct SnapshotDiff<'a> {
    pending: VecDeque<&'a PathRecord>,
    unchanged: usize,
}

impl<'a> SnapshotDiff<'a> {
    /// Start a diff with every prior path pending
    pub fn new(prior: &'a PriorSnapshot) -> Self {
        Self {
            pending: prior.sorted().into(),
            unchanged: 0,
        }
    }

    /// Classify the next current record, returning the changes it settles
    ///
    /// Records must arrive in canonical order, as the walker emits them.
    pub fn advance(&mut self, cur: &PathRecord) -> Vec<Change> {
        let mut changes = Vec::new();
        while let Some(head) = self.pending.front().copied() {
            match compare_path(&head.path, &cur.path) {
                Ordering::Less => {
                    self.pending.pop_front();
                    changes.push(Change::Deleted(head.clone()));
                }
                Ordering::Equal => {
                    self.pending.pop_front();
                    if head == cur {
                        self.unchanged += 1;
                    } else {
                        changes.push(Change::Modified {
                            path: cur.path.clone(),
                            attributes: attribute_changes(head, cur),
                        });
                    }
                    return changes;
                }
                Ordering::Greater => break,
            }
        }
        changes.push(Change::Added(cur.clone()));
        changes
    }

    /// Report every path still pending as deleted
    pub fn finish(&mut self) -> Vec<Change> {
        self.pending.drain(..).cloned().map(Change::Deleted).collect()
    }

    /// Prior paths not settled yet
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Paths found identical so far
    pub fn unchanged(&self) -> usize {
        self.unchanged
    }
}

/// Consumer of the records produced by a scan
pub trait RecordSink {
    /// Handle the next record, in emission order
    fn record(&mut self, record: &PathRecord) -> Result<()>;

    /// Called once after the last record
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    /// Change counts, for sinks that compare against a prior snapshot
    fn change_stats(&self) -> Option<ChangeStats> {
        None
    }
}

/// Writes every record verbatim, one snapshot line each
#[derive(Debug)]
pub struct RawPrinter<W: Write> {
    out: W,
}

impl<W: Write> RawPrinter<W> {
    /// Printer writing to `out`
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Give back the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for RawPrinter<W> {
    fn record(&mut self, record: &PathRecord) -> Result<()> {
        writeln!(self.out, "{}", record)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Writes diff lines for a record stream
#[derive(Debug)]
pub struct DiffReporter<'a, W: Write> {
    diff: SnapshotDiff<'a>,
    color: ColorMode,
    out: W,
    stats: ChangeStats,
}

impl<'a, W: Write> DiffReporter<'a, W> {
    /// Reporter comparing against `prior`, writing to `out`
    pub fn new(prior: &'a PriorSnapshot, color: ColorMode, out: W) -> Self {
        Self {
            diff: SnapshotDiff::new(prior),
            color,
            out,
            stats: ChangeStats::default(),
        }
    }

    /// Counts so far
    pub fn stats(&self) -> ChangeStats {
        ChangeStats {
            unchanged: self.diff.unchanged(),
            ..self.stats
        }
    }

    fn write_changes(&mut self, changes: Vec<Change>) -> Result<()> {
        for change in changes {
            self.stats.count(&change);
            let line = change.to_string();
            writeln!(self.out, "{}", self.color.paint(change.category(), &line))?;
        }
        Ok(())
    }
}

impl<W: Write> RecordSink for DiffReporter<'_, W> {
    fn record(&mut self, record: &PathRecord) -> Result<()> {
        let changes = self.diff.advance(record);
        self.write_changes(changes)
    }

    fn finish(&mut self) -> Result<()> {
        let changes = self.diff.finish();
        self.write_changes(changes)?;
        self.out.flush()?;
        Ok(())
    }

    fn change_stats(&self) -> Option<ChangeStats> {
        Some(self.stats())
    }
}
