//! Utility functions for treestat
//!
//! Rendering of filesystem metadata into the textual attributes stored in
//! snapshot records, plus the path helpers the walker and the run
//! orchestration share.
//!
//! ## Attribute rendering
//!
//! - permissions: the 9 POSIX bits as `rwxr-xr-x`
//! - owner / group: account names from the system database, the numeric id
//!   when the id has no name
//! - modification time: UTC ISO-8601, fractional seconds without trailing
//!   zeros (`2024-03-05T07:08:09.01Z`, `2024-03-05T07:08:09Z`)

use crate::error::{Result, StatError};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// Textual attributes shared by every kind of record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attributes {
    /// Raw size reported by the filesystem (link inode size for symlinks)
    pub size: u64,
    /// Owner account name
    pub owner: String,
    /// Group account name
    pub group: String,
    /// `rwxr-xr-x` style permissions
    pub permissions: String,
    /// ISO-8601 modification time
    pub modified: String,
}

impl Attributes {
    /// Render the attributes of metadata obtained without following links
    ///
    /// # Errors
    ///
    /// - [`StatError::Io`] if the platform does not report a modification time
    pub fn from_metadata(metadata: &fs::Metadata) -> Result<Self> {
        let (owner, group) = owner_and_group(metadata);
        Ok(Self {
            size: metadata.len(),
            owner,
            group,
            permissions: permission_string(permission_bits(metadata)),
            modified: format_modified(metadata.modified()?),
        })
    }
}

/// Render the 9 permission bits of a mode as `rwxr-xr-x`
pub fn permission_string(mode: u32) -> String {
    const FLAGS: [(u32, char); 9] = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ];
    FLAGS
        .iter()
        .map(|&(bit, flag)| if mode & bit != 0 { flag } else { '-' })
        .collect()
}

/// Render a modification time as UTC ISO-8601 text
pub fn format_modified(time: SystemTime) -> String {
    let datetime: DateTime<Utc> = time.into();
    let mut text = datetime.format("%Y-%m-%dT%H:%M:%S").to_string();
    let nanos = datetime.timestamp_subsec_nanos();
    if nanos > 0 {
        let fraction = format!("{:09}", nanos);
        text.push('.');
        text.push_str(fraction.trim_end_matches('0'));
    }
    text.push('Z');
    text
}

#[cfg(unix)]
fn permission_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o666
    }
}

#[cfg(unix)]
fn owner_and_group(metadata: &fs::Metadata) -> (String, String) {
    use nix::unistd::{Gid, Group, Uid, User};
    use std::os::unix::fs::MetadataExt;

    let uid = metadata.uid();
    let gid = metadata.gid();
    let owner = User::from_uid(Uid::from_raw(uid))
        .ok()
        .flatten()
        .map(|user| user.name)
        .unwrap_or_else(|| uid.to_string());
    let group = Group::from_gid(Gid::from_raw(gid))
        .ok()
        .flatten()
        .map(|group| group.name)
        .unwrap_or_else(|| gid.to_string());
    (owner, group)
}

#[cfg(not(unix))]
fn owner_and_group(_metadata: &fs::Metadata) -> (String, String) {
    (String::new(), String::new())
}

/// Render a path with `/` separators
///
/// # Errors
///
/// - [`StatError::InvalidPathEncoding`] if the path is not valid UTF-8
pub fn to_slash(path: &Path) -> Result<String> {
    let text = path.to_str().ok_or_else(|| StatError::InvalidPathEncoding {
        path: path.to_path_buf(),
    })?;
    if cfg!(windows) {
        Ok(text.replace('\\', "/"))
    } else {
        Ok(text.to_string())
    }
}

/// Path of `path` below `base`, rendered with `/` separators
///
/// # Errors
///
/// - [`StatError::Internal`] if `path` does not live below `base`
/// - [`StatError::InvalidPathEncoding`] if the relative part is not valid UTF-8
pub fn make_relative(path: &Path, base: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(base)
        .map_err(|_| StatError::internal(format!("Path {:?} is not relative to {:?}", path, base)))?;
    to_slash(relative).map_err(|_| StatError::InvalidPathEncoding {
        path: path.to_path_buf(),
    })
}

/// Lexical path normalization without filesystem access
///
/// Removes `.` components and resolves `..` lexically; symbolic links are
/// left alone.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                } else if !matches!(components.last(), Some(Component::RootDir)) {
                    components.push(component);
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

/// Absolute, lexically normalized form of `path`
///
/// # Errors
///
/// - [`StatError::Io`] if the current directory cannot be determined
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(lexical_normalize(&absolute))
}

/// Format bytes in human-readable form
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
