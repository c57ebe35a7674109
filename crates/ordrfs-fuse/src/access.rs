//! Permission policy of the synthetic namespace.
//!
//! | class                 | allowed                 |
//! |-----------------------|-------------------------|
//! | Root                  | read, write, traverse   |
//! | Category / Restaurant | read, traverse          |
//! | menu file             | read                    |
//! | Other                 | whatever the backing store says |

use crate::classify::PathClass;
use crate::error::{FsError, FsResult};

pub const R_OK: u32 = libc::R_OK as u32;
pub const W_OK: u32 = libc::W_OK as u32;
pub const X_OK: u32 = libc::X_OK as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
    /// Ask the backing store.
    Delegate,
}

/// Decide an `access(2)`-style check for `mask` on a classified path.
pub fn access_decision(class: &PathClass, mask: u32) -> AccessDecision {
    match class {
        PathClass::Root => AccessDecision::Allow,
        PathClass::Category(_) | PathClass::Restaurant { .. } => {
            if mask & W_OK != 0 {
                AccessDecision::Deny
            } else {
                AccessDecision::Allow
            }
        }
        PathClass::SyntheticFile { .. } => {
            if mask & (W_OK | X_OK) != 0 {
                AccessDecision::Deny
            } else {
                AccessDecision::Allow
            }
        }
        PathClass::Other(_) => AccessDecision::Delegate,
    }
}

/// Open flags that imply modifying the file.
pub fn wants_write(flags: i32) -> bool {
    let accmode = flags & libc::O_ACCMODE;
    accmode == libc::O_WRONLY || accmode == libc::O_RDWR || flags & (libc::O_TRUNC | libc::O_APPEND) != 0
}

/// Synthetic entries cannot be modified, renamed, or removed; neither can the
/// root be removed or renamed.
pub fn ensure_removable(class: &PathClass, path: &str) -> FsResult<()> {
    match class {
        PathClass::Other(_) => Ok(()),
        _ => Err(FsError::PermissionDenied(path.to_string())),
    }
}

/// Attribute changes are refused on synthetic entries.
pub fn ensure_mutable(class: &PathClass, path: &str) -> FsResult<()> {
    if class.is_synthetic() {
        Err(FsError::PermissionDenied(path.to_string()))
    } else {
        Ok(())
    }
}

/// What is being created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewEntry {
    /// Regular file, node, symlink, hard link, or rename destination.
    File,
    Directory,
}

/// Check that a new entry may appear at `path`.
///
/// `child` is the class of `path` itself and `parent` the class of its
/// parent directory. Nothing may be created over a synthetic name or inside a
/// category; directories may only be created directly inside a restaurant.
pub fn ensure_creatable(
    parent: &PathClass,
    child: &PathClass,
    entry: NewEntry,
    path: &str,
) -> FsResult<()> {
    if child.is_synthetic() || matches!(child, PathClass::Root) {
        return Err(FsError::PermissionDenied(path.to_string()));
    }
    match (parent, entry) {
        (PathClass::SyntheticFile { .. }, _) => Err(FsError::NotADirectory(path.to_string())),
        (PathClass::Category(_), _) => Err(FsError::PermissionDenied(path.to_string())),
        (PathClass::Restaurant { .. }, _) => Ok(()),
        (_, NewEntry::Directory) => Err(FsError::PermissionDenied(path.to_string())),
        (PathClass::Root | PathClass::Other(_), NewEntry::File) => Ok(()),
    }
}
