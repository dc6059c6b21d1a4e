//! Main test module for treestat
//!
//! This module includes all test suites:
//! - Integration tests for whole scans and save/diff cycles
//! - Property-based tests for ordering and line format invariants
//! - Edge cases of the filesystem walk

pub mod integration;

#[cfg(test)]
mod edge_cases {
    use ::treestat::*;
    use std::fs;
    use tempfile::TempDir;

    fn scan(root: &std::path::Path) -> Result<Vec<PathRecord>> {
        let matcher = IgnoreMatcher::new();
        let prior = PriorSnapshot::default();
        SnapshotWalker::new(root, &matcher, &prior, true)?.collect()
    }

    #[test]
    fn test_empty_directory() {
        let temp_dir = TempDir::new().unwrap();

        let records = scan(temp_dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, ".");
        assert_eq!(records[0].size, 0);
        assert_eq!(records[0].fingerprint(), EMPTY_DIGEST);
    }

    #[test]
    fn test_special_filenames() {
        let temp_dir = TempDir::new().unwrap();
        let names = ["file with spaces.txt", "file-dash.txt", "file.multiple.dots", ".hidden", "a#b"];
        for name in &names {
            fs::write(temp_dir.path().join(name), name.as_bytes()).unwrap();
        }

        let records = scan(temp_dir.path()).unwrap();
        assert_eq!(records.len(), names.len() + 1);
        for name in &names {
            let record = records.iter().find(|r| r.path == *name).unwrap();
            assert_eq!(record.size, name.len() as u64);
            assert_eq!(PathRecord::deserialize(&record.serialize()).unwrap(), *record);
        }
    }

    #[test]
    fn test_unicode_filenames() {
        let temp_dir = TempDir::new().unwrap();
        let names = ["文件.txt", "файл.txt", "αρχείο.txt", "emoji_🎉.txt"];
        for name in &names {
            fs::write(temp_dir.path().join(name), "content").unwrap();
        }

        let records = scan(temp_dir.path()).unwrap();
        let mut emitted: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(emitted.pop(), Some("."));
        let mut sorted = emitted.clone();
        sorted.sort_by(|a, b| compare_path(a, b));
        assert_eq!(emitted, sorted);
        assert_eq!(emitted.len(), names.len());
    }

    #[test]
    fn test_ancestor_after_siblings_with_smaller_characters() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("a")).unwrap();
        fs::write(temp_dir.path().join("a/x"), "1").unwrap();
        fs::write(temp_dir.path().join("a-b"), "2").unwrap();
        fs::write(temp_dir.path().join("a.b"), "3").unwrap();

        let records = scan(temp_dir.path()).unwrap();
        let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["a/x", "a", "a-b", "a.b", "."]);
    }

    #[cfg(unix)]
    #[test]
    fn test_permissions_are_rendered() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let script = temp_dir.path().join("script.sh");
        fs::write(&script, "#!/bin/sh").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o750)).unwrap();

        let records = scan(temp_dir.path()).unwrap();
        assert_eq!(records[0].permissions, "rwxr-x---");
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink() {
        let temp_dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink("nowhere/at/all", temp_dir.path().join("dangling")).unwrap();

        let records = scan(temp_dir.path()).unwrap();
        assert_eq!(records[0].kind(), PathKind::SymbolicLink);
        assert_eq!(records[0].fingerprint(), "nowhere/at/all");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_is_not_entered() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("real")).unwrap();
        fs::write(temp_dir.path().join("real/f"), "x").unwrap();
        std::os::unix::fs::symlink("real", temp_dir.path().join("via")).unwrap();

        let records = scan(temp_dir.path()).unwrap();
        let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["real/f", "real", "via", "."]);
    }

    #[test]
    fn test_file_target_is_relative_to_parent() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("sub/only.txt"), "abc").unwrap();
        fs::write(temp_dir.path().join("sub/other.txt"), "xyz").unwrap();

        let records = scan(&temp_dir.path().join("sub/only.txt")).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, "only.txt");
        assert_eq!(records[0].fingerprint(), digest::hash_bytes(b"abc"));
    }

    #[test]
    fn test_missing_target() {
        let temp_dir = TempDir::new().unwrap();
        let err = scan(&temp_dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, StatError::FileNotFound { .. }));
        assert!(err.is_classification_error());
    }
}
