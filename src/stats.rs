//! Run orchestration
//!
//! [`Stats`] ties the pieces of a run together: it resolves the base and
//! storage directories, assembles the ignore rules, loads the prior
//! snapshot, then drives the walker into the requested outputs.
//!
//! ## Outputs
//!
//! | mode    | save  | stdout                 | snapshot file |
//! |---------|-------|------------------------|---------------|
//! | `Print` | no    | raw records            | -             |
//! | `Print` | yes   | path of the new file   | raw records   |
//! | `Diff`  | no    | diff lines             | -             |
//! | `Diff`  | yes   | diff lines, then path  | raw records   |
//!
//! A saved snapshot always holds raw records, so it can be loaded back as
//! the prior snapshot of the next run.
//!
//! ```rust,no_run
//! use treestat::{OutputMode, StatsBuilder};
//!
//! # fn main() -> treestat::Result<()> {
//! let stats = StatsBuilder::new()
//!     .target("./project")
//!     .mode(OutputMode::Diff)
//!     .ignore("*.tmp")
//!     .build()?;
//! let summary = stats.run(std::io::stdout().lock())?;
//! println!("{} entries", summary.records);
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, StatError};
use crate::ignore::IgnoreMatcher;
use crate::report::{ChangeStats, ColorMode, DiffReporter, RawPrinter, RecordSink};
use crate::snapshot::PriorSnapshot;
use crate::storage::{SnapshotStore, STORAGE_DIR_NAME};
use crate::types::PathRecord;
use crate::utils::{absolute_path, format_bytes, make_relative};
use crate::walker::{base_directory, SnapshotWalker, WalkStats};
use chrono::Utc;
use humantime::format_duration;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// What goes to the main output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Every record, verbatim
    #[default]
    Print,
    /// Differences against the prior snapshot
    Diff,
}

/// Options of a run
#[derive(Debug, Clone)]
pub struct StatOptions {
    /// File or directory to scan
    pub target: PathBuf,
    /// Storage directory override; `<base>/.directory-stats` when unset
    pub storage_dir: Option<PathBuf>,
    /// Whether to compute content digests
    pub hashing: bool,
    /// Raw records or diff
    pub mode: OutputMode,
    /// Color of diff lines
    pub color: ColorMode,
    /// Whether to save the scan as a new snapshot
    pub save: bool,
    /// Extra ignore patterns
    pub ignore_patterns: Vec<String>,
}

impl Default for StatOptions {
    fn default() -> Self {
        Self {
            target: PathBuf::from("."),
            storage_dir: None,
            hashing: true,
            mode: OutputMode::Print,
            color: ColorMode::Never,
            save: false,
            ignore_patterns: Vec::new(),
        }
    }
}

/// Builder for [`Stats`]
///
/// # Default Values
///
/// - `target`: current directory
/// - `storage_dir`: `.directory-stats` in the base directory
/// - `hashing`: enabled
/// - `mode`: [`OutputMode::Print`]
/// - `color`: [`ColorMode::Never`]
/// - `save`: false
/// - `ignore_patterns`: empty (the storage directory is always ignored)
#[derive(Debug, Default)]
pub struct StatsBuilder {
    options: StatOptions,
}

impl StatsBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file or directory to scan
    pub fn target(mut self, target: impl Into<PathBuf>) -> Self {
        self.options.target = target.into();
        self
    }

    /// Override the storage directory
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.storage_dir = Some(dir.into());
        self
    }

    /// Enable or disable content digests
    pub fn hashing(mut self, enabled: bool) -> Self {
        self.options.hashing = enabled;
        self
    }

    /// Set the output mode
    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.options.mode = mode;
        self
    }

    /// Set the color mode of diff lines
    pub fn color(mut self, color: ColorMode) -> Self {
        self.options.color = color;
        self
    }

    /// Save the scan as a new snapshot
    pub fn save(mut self, save: bool) -> Self {
        self.options.save = save;
        self
    }

    /// Add one ignore pattern
    pub fn ignore(mut self, pattern: impl Into<String>) -> Self {
        self.options.ignore_patterns.push(pattern.into());
        self
    }

    /// Add several ignore patterns
    pub fn ignore_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options
            .ignore_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Resolve directories, read ignore rules and load the prior snapshot
    ///
    /// # Errors
    ///
    /// - [`StatError::InvalidArguments`] if the target path is empty
    /// - [`StatError::Io`] if the storage directory cannot be read
    /// - [`StatError::SnapshotParse`] if the latest snapshot is malformed
    pub fn build(self) -> Result<Stats> {
        Stats::open(self.options)
    }
}

/// Outcome of a run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Records emitted by the walk
    pub records: usize,
    /// Walk counters
    pub walk: WalkStats,
    /// Last record emitted, the scan root
    pub root: Option<PathRecord>,
    /// Change counts in diff mode
    pub changes: Option<ChangeStats>,
    /// Location of the saved snapshot
    pub saved: Option<PathBuf>,
    /// Wall time of the walk
    pub elapsed: Duration,
}

/// A configured run, ready to walk
#[derive(Debug)]
pub struct Stats {
    options: StatOptions,
    root: PathBuf,
    base: PathBuf,
    store: SnapshotStore,
    matcher: IgnoreMatcher,
    prior: PriorSnapshot,
}

impl Stats {
    /// Prepare a run from options
    ///
    /// # Errors
    ///
    /// See [`StatsBuilder::build`].
    pub fn open(options: StatOptions) -> Result<Self> {
        if options.target.as_os_str().is_empty() {
            return Err(StatError::InvalidArguments("empty target path".to_string()));
        }
        let root = absolute_path(&options.target)?;
        let base = base_directory(&root);

        let (store, storage_rule) = match &options.storage_dir {
            Some(dir) => {
                let dir = absolute_path(dir)?;
                let rule = make_relative(&dir, &base).ok();
                (SnapshotStore::new(dir), rule)
            }
            None => (
                SnapshotStore::for_base(&base),
                Some(STORAGE_DIR_NAME.to_string()),
            ),
        };

        let mut matcher = IgnoreMatcher::new();
        if let Some(rule) = storage_rule {
            matcher.add(&rule);
        }
        matcher.add_all(&options.ignore_patterns);
        matcher.add_all(store.ignore_patterns()?);

        let prior = store.load_prior()?;
        debug!(
            "Base {:?}, storage {:?}, {} exact + {} advanced ignore rules, {} prior records",
            base,
            store.path(),
            matcher.exact_count(),
            matcher.rules().len(),
            prior.len()
        );

        Ok(Self {
            options,
            root,
            base,
            store,
            matcher,
            prior,
        })
    }

    /// Options of this run
    pub fn options(&self) -> &StatOptions {
        &self.options
    }

    /// Directory snapshot paths are relative to
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Storage directory of this run
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Effective ignore rules
    pub fn matcher(&self) -> &IgnoreMatcher {
        &self.matcher
    }

    /// Snapshot loaded at open time
    pub fn prior(&self) -> &PriorSnapshot {
        &self.prior
    }

    /// Fresh walker over the target
    pub fn walker(&self) -> SnapshotWalker<'_> {
        SnapshotWalker::with_base(
            self.base.clone(),
            self.root.clone(),
            &self.matcher,
            &self.prior,
            self.options.hashing,
        )
    }

    /// Walk the target and write the outputs
    ///
    /// # Errors
    ///
    /// Any walk, write or save failure; a snapshot being saved is discarded.
    pub fn run<W: Write>(&self, out: W) -> Result<RunSummary> {
        self.run_with_progress(out, None::<fn(&PathRecord)>)
    }

    /// Like [`run`](Self::run), calling `progress` after each record
    pub fn run_with_progress<W, F>(&self, mut out: W, mut progress: Option<F>) -> Result<RunSummary>
    where
        W: Write,
        F: FnMut(&PathRecord),
    {
        let started = Instant::now();
        let mut writer = if self.options.save {
            Some(self.store.create_writer(Utc::now())?)
        } else {
            None
        };

        let mut summary = RunSummary::default();
        let mut walker = self.walker();
        {
            let mut sinks: Vec<Box<dyn RecordSink + '_>> = Vec::new();
            if let Some(writer) = writer.as_mut() {
                sinks.push(Box::new(RawPrinter::new(writer)));
            }
            match self.options.mode {
                OutputMode::Diff => sinks.push(Box::new(DiffReporter::new(
                    &self.prior,
                    self.options.color,
                    &mut out,
                ))),
                OutputMode::Print if !self.options.save => {
                    sinks.push(Box::new(RawPrinter::new(&mut out)))
                }
                OutputMode::Print => {}
            }

            for record in walker.by_ref() {
                let record = record?;
                for sink in sinks.iter_mut() {
                    sink.record(&record)?;
                }
                if let Some(callback) = progress.as_mut() {
                    callback(&record);
                }
                summary.records += 1;
                summary.root = Some(record);
            }
            for sink in sinks.iter_mut() {
                sink.finish()?;
            }
            summary.changes = sinks.iter().find_map(|sink| sink.change_stats());
        }
        summary.walk = walker.stats();
        summary.elapsed = started.elapsed();

        if let Some(writer) = writer {
            let saved = writer.persist()?;
            writeln!(out, "{}", saved.display())?;
            summary.saved = Some(saved);
        }

        info!(
            "Scanned {} entries ({} files, {} directories, {} links, {} skipped), {} in {}",
            summary.records,
            summary.walk.files,
            summary.walk.directories,
            summary.walk.symlinks,
            summary.walk.skipped,
            format_bytes(summary.root.as_ref().map_or(0, |root| root.size)),
            format_duration(summary.elapsed)
        );
        if let Some(changes) = summary.changes {
            info!(
                "{} added, {} deleted, {} modified, {} unchanged",
                changes.added, changes.deleted, changes.modified, changes.unchanged
            );
        }
        Ok(summary)
    }
}
