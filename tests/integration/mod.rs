//! Integration tests for treestat
//!
//! Whole scans over real temporary trees: the reference scenarios, ignore
//! rules, digest reuse, and save/diff cycles over generated projects.

use ::treestat::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;

/// Test harness around a temporary tree
pub struct StatTestHarness {
    pub temp_dir: TempDir,
    pub file_generator: FileGenerator,
}

impl StatTestHarness {
    /// Create a harness over an empty directory
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
            file_generator: FileGenerator::new(42),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a file, creating parent directories
    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Records of a scan of the whole tree
    pub fn scan(&self, patterns: &[&str]) -> Vec<PathRecord> {
        let matcher = IgnoreMatcher::new().with_patterns(patterns);
        let prior = PriorSnapshot::default();
        SnapshotWalker::new(self.root(), &matcher, &prior, true)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    /// Run with the given builder settings, capturing stdout
    pub fn run(&self, builder: StatsBuilder) -> (Vec<String>, RunSummary) {
        let stats = builder.target(self.root()).build().unwrap();
        let mut out = Vec::new();
        let summary = stats.run(&mut out).unwrap();
        let lines = String::from_utf8(out).unwrap().lines().map(str::to_string).collect();
        (lines, summary)
    }

    /// Populate a nested project of random files
    pub fn generate_project(&mut self, config: ProjectConfig) -> anyhow::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for depth in 1..=config.max_depth {
            for dir_idx in 0..config.dirs_per_level {
                let mut path = self.root().to_path_buf();
                for level in 0..depth {
                    path = path.join(format!("dir_{}_{}", level, dir_idx));
                }
                fs::create_dir_all(&path)?;

                for file_idx in 0..config.files_per_dir {
                    let file_path = path.join(format!("file_{}.txt", file_idx));
                    let content = self.file_generator.generate_file_content(config.file_size_range.clone());
                    fs::write(&file_path, &content)?;
                    files.push(file_path);
                }
            }
        }
        Ok(files)
    }
}

/// Shape of a generated project
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub max_depth: usize,
    pub dirs_per_level: usize,
    pub files_per_dir: usize,
    pub file_size_range: std::ops::Range<usize>,
}

/// Deterministic random file content
pub struct FileGenerator {
    pub rng: StdRng,
}

impl FileGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn generate_file_content(&mut self, size_range: std::ops::Range<usize>) -> Vec<u8> {
        let size = self.rng.random_range(size_range);
        (0..size).map(|_| self.rng.random()).collect()
    }
}

fn find<'a>(records: &'a [PathRecord], path: &str) -> &'a PathRecord {
    records
        .iter()
        .find(|record| record.path == path)
        .unwrap_or_else(|| panic!("no record for {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use tracing_test::traced_test;

    #[cfg(unix)]
    #[test]
    fn test_scenario_a_file_and_link() {
        let harness = StatTestHarness::new();
        harness.write("data.txt", "abcd");
        std::os::unix::fs::symlink("data.txt", harness.root().join("link.txt")).unwrap();

        let records = harness.scan(&[]);
        let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["data.txt", "link.txt", "."]);

        let data = find(&records, "data.txt");
        let link = find(&records, "link.txt");
        let root = find(&records, ".");
        assert_eq!(data.fingerprint(), digest::hash_bytes(b"abcd"));
        assert_eq!(link.kind(), PathKind::SymbolicLink);
        assert_eq!(link.fingerprint(), "data.txt");

        let expected = digest::hash_bytes(format!("{}data.txt", data.fingerprint()).as_bytes());
        assert_eq!(root.fingerprint(), expected);
        assert_eq!(root.size, data.size + link.size);
    }

    #[cfg(unix)]
    #[test]
    fn test_scenario_b_exact_ignore() {
        let harness = StatTestHarness::new();
        harness.write("data.txt", "abcd");
        std::os::unix::fs::symlink("data.txt", harness.root().join("link.txt")).unwrap();

        let records = harness.scan(&["link.txt"]);
        assert_eq!(records.len(), 2);
        let data = find(&records, "data.txt");
        let root = find(&records, ".");
        assert_eq!(root.size, 4);
        assert_eq!(root.fingerprint(), digest::aggregate([data]));
    }

    #[test]
    fn test_scenario_c_suffix_ignore_empties_directory() {
        let harness = StatTestHarness::new();
        harness.write("docs/a.txt", "aaa");
        harness.write("docs/b.txt", "bb");
        harness.write("keep.rs", "k");

        let records = harness.scan(&["*.txt"]);
        let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["docs", "keep.rs", "."]);

        let docs = find(&records, "docs");
        assert_eq!(docs.size, 0);
        assert_eq!(docs.fingerprint(), EMPTY_DIGEST);
        assert_eq!(find(&records, ".").size, 1);
    }

    #[test]
    #[traced_test]
    fn test_scenario_d_diff() {
        let harness = StatTestHarness::new();
        for name in ["f1", "f2", "f3", "f5"] {
            harness.write(name, format!("content of {}", name));
        }
        harness.run(StatsBuilder::new().save(true));

        fs::remove_file(harness.root().join("f2")).unwrap();
        let f3 = harness.write("f3", "a longer content of f3");
        filetime::set_file_mtime(&f3, FileTime::from_unix_time(1_000_000_000, 0)).unwrap();
        harness.write("f4", "new");

        let (lines, summary) = harness.run(StatsBuilder::new().mode(OutputMode::Diff));
        assert_eq!(lines.len(), 4, "{:?}", lines);
        assert!(lines[0].starts_with("-del- f2|f|"));
        assert!(lines[1].starts_with("~mod~ f3|"));
        assert!(lines[2].starts_with("+new+ f4|f|3|"));
        assert!(lines[3].starts_with("~mod~ .|"));

        let f3_line = &lines[1];
        assert!(f3_line.contains(" size 13 -> 22 |"));
        assert!(f3_line.contains(" modifiedTime "));
        assert!(f3_line.contains("-> 2001-09-09T01:46:40Z |"));
        assert!(f3_line.contains(" fingerprint "));
        for attribute in ["kind", "owner", "group", "permissions"] {
            assert!(!f3_line.contains(&format!(" {} ", attribute)), "{}", f3_line);
        }
        assert!(lines[3].contains(" size "));
        assert!(lines[3].contains(" fingerprint "));

        let changes = summary.changes.unwrap();
        assert_eq!((changes.added, changes.deleted, changes.modified), (1, 1, 2));
        assert_eq!(changes.unchanged, 2);
    }

    #[test]
    fn test_conditional_sibling_ignore() {
        let harness = StatTestHarness::new();
        harness.write("app/pom.xml", "<project/>");
        harness.write("app/target/app.jar", "jar");
        harness.write("lib/target/lib.jar", "jar");

        let records = harness.scan(&["(?sibling:pom.xml)target"]);
        let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["app/pom.xml", "app", "lib/target/lib.jar", "lib/target", "lib", "."]
        );

        // Without its sibling marker the directory is scanned again
        fs::remove_file(harness.root().join("app/pom.xml")).unwrap();
        let records = harness.scan(&["(?sibling:pom.xml)target"]);
        let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["app/target/app.jar", "app/target", "app", "lib/target/lib.jar", "lib/target", "lib", "."]
        );
    }

    #[test]
    fn test_reuse_trusts_edited_snapshot() {
        let harness = StatTestHarness::new();
        harness.write("f", "data");
        let (_, summary) = harness.run(StatsBuilder::new().save(true));
        let saved = summary.saved.unwrap();

        let real = digest::hash_bytes(b"data");
        let forged = "0123456789abcdef0123456789abcdef01234567";
        let content = fs::read_to_string(&saved).unwrap();
        fs::write(&saved, content.replace(&real, forged)).unwrap();

        let (lines, _) = harness.run(StatsBuilder::new());
        assert!(lines[0].starts_with("f|f|4|"));
        assert!(lines[0].ends_with(forged));
        assert!(lines[1].ends_with(&digest::hash_bytes(forged.as_bytes())));

        // A metadata change forces a fresh digest
        harness.write("f", "DATA!");
        let (lines, _) = harness.run(StatsBuilder::new());
        assert!(lines[0].ends_with(&digest::hash_bytes(b"DATA!")));
    }

    #[test]
    fn test_malformed_snapshot_is_reported() {
        let harness = StatTestHarness::new();
        harness.write("f", "data");
        let storage = harness.root().join(STORAGE_DIR_NAME);
        fs::create_dir(&storage).unwrap();
        fs::write(storage.join("stat-2024.01.01-00h00m00s000"), "f|f|4|u|g|rw-r--r--|t\n").unwrap();

        let err = StatsBuilder::new().target(harness.root()).build().unwrap_err();
        assert!(err.is_format_error());
        assert!(matches!(err, StatError::SnapshotParse { line_number: 1, .. }));
    }

    #[test]
    fn test_generated_project_matches_walkdir() {
        let mut harness = StatTestHarness::new();
        let files = harness
            .generate_project(ProjectConfig {
                max_depth: 3,
                dirs_per_level: 3,
                files_per_dir: 4,
                file_size_range: 0..2_000,
            })
            .unwrap();
        info!("Generated {} files", files.len());

        let records = harness.scan(&[]);
        let expected = walkdir::WalkDir::new(harness.root())
            .into_iter()
            .filter_map(|e| e.ok())
            .count();
        assert_eq!(records.len(), expected);

        // Every directory's size is the sum of its children's
        let by_path: BTreeMap<&str, &PathRecord> =
            records.iter().map(|r| (r.path.as_str(), r)).collect();
        for record in records.iter().filter(|r| r.kind() == PathKind::Directory) {
            let children_size: u64 = records
                .iter()
                .filter(|child| parent_of(&child.path) == Some(record.path.as_str()))
                .map(|child| child.size)
                .sum();
            assert_eq!(by_path[record.path.as_str()].size, children_size, "{}", record.path);
        }

        let total: u64 = files.iter().map(|f| fs::metadata(f).unwrap().len()).sum();
        assert_eq!(find(&records, ".").size, total);
    }

    #[test]
    fn test_repeated_save_diff_cycles() {
        let mut harness = StatTestHarness::new();
        let files = harness
            .generate_project(ProjectConfig {
                max_depth: 2,
                dirs_per_level: 2,
                files_per_dir: 5,
                file_size_range: 10..500,
            })
            .unwrap();
        harness.run(StatsBuilder::new().save(true));

        for (round, file) in files.iter().enumerate().take(3) {
            let content = harness.file_generator.generate_file_content(600..700);
            fs::write(file, content).unwrap();
            // Snapshot names have millisecond resolution
            std::thread::sleep(std::time::Duration::from_millis(5));

            let (lines, summary) = harness.run(StatsBuilder::new().mode(OutputMode::Diff).save(true));
            let changes = summary.changes.unwrap();
            assert_eq!(changes.added + changes.deleted, 0, "round {}", round);
            // The file plus each ancestor directory up to the root
            let relative = file.strip_prefix(harness.root()).unwrap();
            assert_eq!(changes.modified, relative.components().count() + 1, "{:?}", lines);
            assert_eq!(lines.last(), summary.saved.map(|p| p.display().to_string()).as_ref());
        }

        let store = SnapshotStore::for_base(harness.root());
        assert!(store.latest_snapshot().unwrap().is_some());
    }

    fn parent_of(path: &str) -> Option<&str> {
        if path == ROOT_PATH {
            return None;
        }
        Some(path.rfind('/').map_or(ROOT_PATH, |idx| &path[..idx]))
    }
}
