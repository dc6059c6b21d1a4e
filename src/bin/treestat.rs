//! # treestat CLI
//!
//! Prints a snapshot of a file or directory tree, saves it, or compares it
//! with the most recent saved snapshot.
//!
//! ## Usage
//! ```bash
//! # Print one record per path
//! treestat ./project
//!
//! # Save a snapshot into ./project/.directory-stats
//! treestat --save ./project
//!
//! # What changed since the last saved snapshot?
//! treestat --diff --color ./project
//!
//! # Metadata only, skipping build output
//! treestat --no-hash --ignore '(?sibling:Cargo.toml)target' ./project
//! ```
//!
//! Records and diff lines go to stdout; logs and the progress spinner go to
//! stderr.

use anyhow::Context;
use clap::Parser;
use colored::*;
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use treestat::{ColorMode, OutputMode, PathRecord, StatsBuilder};

/// Directory statistics snapshots
#[derive(Parser)]
#[command(name = "treestat")]
#[command(version)]
#[command(about = "Snapshot a directory tree and report what changed since the last snapshot")]
#[command(long_about = None)]
struct Cli {
    /// File or directory to scan (defaults to current)
    path: Option<PathBuf>,

    /// Skip content digests
    #[arg(long, visible_alias = "no-sha1")]
    no_hash: bool,

    /// Save the scan as a new snapshot
    #[arg(long)]
    save: bool,

    /// Report differences against the latest snapshot
    #[arg(long)]
    diff: bool,

    /// Color diff lines
    #[arg(long)]
    color: bool,

    /// Additional ignore pattern (repeatable)
    #[arg(short, long, value_name = "PATTERN")]
    ignore: Vec<String>,

    /// Storage directory (defaults to <base>/.directory-stats)
    #[arg(long, value_name = "DIR")]
    stats_directory: Option<PathBuf>,

    /// Show a spinner while saving
    #[arg(long)]
    progress: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr, stdout carries the report
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main command runner
fn run(cli: Cli) -> anyhow::Result<()> {
    let color = if cli.color && std::env::var_os("NO_COLOR").is_none() {
        ColorMode::Always
    } else {
        ColorMode::Never
    };
    let mode = if cli.diff { OutputMode::Diff } else { OutputMode::Print };
    let target = cli.path.unwrap_or_else(|| PathBuf::from("."));

    let mut builder = StatsBuilder::new()
        .target(&target)
        .hashing(!cli.no_hash)
        .mode(mode)
        .color(color)
        .save(cli.save)
        .ignore_patterns(cli.ignore);
    if let Some(dir) = cli.stats_directory {
        builder = builder.storage_dir(dir);
    }
    let stats = builder
        .build()
        .with_context(|| format!("cannot prepare scan of {}", target.display()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let spinner = if cli.progress && cli.save {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {pos} entries {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let result = match &spinner {
        Some(pb) => stats.run_with_progress(
            &mut out,
            Some(|record: &PathRecord| {
                pb.inc(1);
                pb.set_message(record.path.clone());
            }),
        ),
        None => stats.run(&mut out),
    };
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let summary = result.with_context(|| format!("scan of {} failed", target.display()))?;
    out.flush()?;

    if cli.verbose {
        eprintln!(
            "{} {} entries in {}",
            "✓".green().bold(),
            summary.records.to_string().cyan(),
            format_duration(summary.elapsed).to_string().cyan()
        );
    }
    Ok(())
}
