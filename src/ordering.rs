//! Canonical ordering of snapshot paths
//!
//! Snapshot paths are sorted with an order that places every descendant of a
//! directory before the directory itself, and the scan root `.` after
//! everything else. This is exactly the order in which the walker emits
//! records (post-order over children sorted by name), which is what lets the
//! diff reporter merge a live scan against a saved snapshot in one pass.
//!
//! The rules, for two paths `a` and `b`:
//!
//! - equal strings are equal;
//! - `.` is greater than any other path;
//! - otherwise characters are compared one by one; at the first difference a separator sorts lower than any other
//!   character, other characters compare by code point;
//! - on Windows `\` is read as `/`; elsewhere it is an ordinary character,
//!   since it can appear inside a file name;
//! - when one path is a strict prefix of the other, the shorter one is
//!   greater if the longer continues with a separator (`a` after `a/b`) and
//!   lower otherwise (`a` before `ab`).
//!
//! Internally each path is turned into a sequence of ranks: separators rank
//! 0, the end of the path ranks 1 and every other character ranks above
//! both. Comparing those sequences lexicographically gives the rules above
//! and makes the order total.
//!
//! ```rust
//! use std::cmp::Ordering;
//! use treestat::ordering::compare_path;
//!
//! assert_eq!(compare_path("a/b", "a"), Ordering::Less);
//! assert_eq!(compare_path("a", "ab"), Ordering::Less);
//! assert_eq!(compare_path("a/b", "a.b"), Ordering::Less);
//! assert_eq!(compare_path("zzz", "."), Ordering::Less);
//! ```

use std::cmp::Ordering;
use std::iter;

/// Path of the scan's base directory in snapshot records
pub const ROOT_PATH: &str = ".";

const SEPARATOR_RANK: u32 = 0;
const END_RANK: u32 = 1;

fn rank(ch: char) -> u32 {
    match ch {
        '/' => SEPARATOR_RANK,
        '\\' if cfg!(windows) => SEPARATOR_RANK,
        other => other as u32 + 2,
    }
}

fn ranks(path: &str) -> impl Iterator<Item = u32> + '_ {
    path.chars().map(rank).chain(iter::once(END_RANK))
}

/// Compare two snapshot paths in canonical order
pub fn compare_path(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    match (a == ROOT_PATH, b == ROOT_PATH) {
        (true, _) => Ordering::Greater,
        (_, true) => Ordering::Less,
        _ => ranks(a).cmp(ranks(b)),
    }
}
