//! Ignore rules for snapshot scans
//!
//! Patterns come from the command line, from the `ignore` file of the
//! storage directory, and from the storage directory itself (which is always
//! ignored). Each pattern is classified once, when it is added:
//!
//! | Pattern                     | Rule                                              |
//! |-----------------------------|---------------------------------------------------|
//! | `*<suffix>`                 | relative path ends with `<suffix>`                |
//! | `(?sibling:<name>)<base>`   | last component is `<base>` and `<name>` exists next to it |
//! | anything else               | relative path equals the pattern verbatim         |
//!
//! Blank lines and lines starting with `#` are skipped, so an ignore file can
//! be fed in line by line.
//!
//! ```text
//! # build output
//! target
//! *.tmp
//! (?sibling:package.json)node_modules
//! ```
//!
//! The sibling rule hits the filesystem when it is evaluated, so the result
//! reflects the tree as it is while the scan runs.

use crate::collections::{HashSet, HashSetExt};
use std::path::Path;
use tracing::{trace, warn};

const SUFFIX_PREFIX: &str = "*";
const SIBLING_PREFIX: &str = "(?sibling:";

/// A non-exact ignore rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreRule {
    /// Relative path ends with the suffix
    Suffix(String),
    /// Last path component equals `basename` while `sibling` exists in the
    /// same parent directory
    ConditionalSibling {
        /// Name that must exist next to the candidate
        sibling: String,
        /// Name the candidate must have
        basename: String,
    },
}

impl IgnoreRule {
    /// Classify an advanced pattern, `None` if it is an exact path
    pub fn parse(pattern: &str) -> Option<Self> {
        if let Some(suffix) = pattern.strip_prefix(SUFFIX_PREFIX) {
            return Some(IgnoreRule::Suffix(suffix.to_string()));
        }
        if let Some(rest) = pattern.strip_prefix(SIBLING_PREFIX) {
            match rest.split_once(')') {
                Some((sibling, basename)) => {
                    return Some(IgnoreRule::ConditionalSibling {
                        sibling: sibling.to_string(),
                        basename: basename.to_string(),
                    });
                }
                None => warn!("Unterminated sibling pattern {:?}, matching it verbatim", pattern),
            }
        }
        None
    }

    /// Evaluate the rule for one candidate
    pub fn matches(&self, absolute_path: &Path, relative_path: &str) -> bool {
        match self {
            IgnoreRule::Suffix(suffix) => relative_path.ends_with(suffix.as_str()),
            IgnoreRule::ConditionalSibling { sibling, basename } => {
                let name_matches = absolute_path
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy() == basename.as_str());
                if !name_matches {
                    return false;
                }
                absolute_path
                    .parent()
                    .is_some_and(|parent| parent.join(sibling).exists())
            }
        }
    }
}

/// Set of ignore rules applied during a scan
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    exact: HashSet<String>,
    rules: Vec<IgnoreRule>,
}

impl Default for IgnoreMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl IgnoreMatcher {
    /// Create a matcher that ignores nothing
    pub fn new() -> Self {
        Self {
            exact: HashSet::new(),
            rules: Vec::new(),
        }
    }

    /// Add one pattern; blank lines and `#` comments are skipped
    pub fn add(&mut self, pattern: &str) {
        if pattern.trim().is_empty() || pattern.starts_with('#') {
            return;
        }
        match IgnoreRule::parse(pattern) {
            Some(rule) => self.rules.push(rule),
            None => {
                self.exact.insert(pattern.to_string());
            }
        }
    }

    /// Add every pattern of a source (ignore file lines, CLI values...)
    pub fn add_all<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            self.add(pattern.as_ref());
        }
    }

    /// Builder-style variant of [`add_all`](Self::add_all)
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.add_all(patterns);
        self
    }

    /// Whether the entry at `absolute_path`, known as `relative_path` in the
    /// snapshot, must be left out of the scan
    pub fn ignore(&self, absolute_path: &Path, relative_path: &str) -> bool {
        let ignored = self.exact.contains(relative_path)
            || self
                .rules
                .iter()
                .any(|rule| rule.matches(absolute_path, relative_path));
        if ignored {
            trace!("Ignoring {}", relative_path);
        }
        ignored
    }

    /// Number of exact-path patterns
    pub fn exact_count(&self) -> usize {
        self.exact.len()
    }

    /// Advanced (suffix / sibling) rules, in insertion order
    pub fn rules(&self) -> &[IgnoreRule] {
        &self.rules
    }
}
