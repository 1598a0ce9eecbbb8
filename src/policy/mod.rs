//! Path policy for installation-relative paths.
//!
//! Every path the updater stores or compares is kept in one canonical form:
//! forward slashes, no `.` segments, `..` collapsed wherever a preceding
//! segment exists. This module converts between that form and the platform
//! form, resolves paths case-insensitively against what is really on disk,
//! and decides whether a resolved target stays inside the installation root.
//!
//! Classification of paths lives in the submodules:
//! - [`user_config`] - files owned by the user that the updater never overwrites
//! - [`exclusions`] - user-supplied patterns that keep remote entries out of a plan
//!
//! # Examples
//!
//! ```rust
//! use mudsync::policy::normalize;
//!
//! assert_eq!(normalize("scripts\\.\\lua/../sounds/beep.wav"), "scripts/sounds/beep.wav");
//! assert_eq!(normalize(&normalize("a/./b/")), normalize("a/./b/"));
//! ```

pub mod exclusions;
pub mod user_config;

pub use exclusions::ExclusionSet;
pub use user_config::is_user_config;

use crate::core::{Result, UpdateError};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Converts a path to canonical forward-slash form.
///
/// Backslashes become forward slashes, empty and `.` segments are dropped and
/// `..` removes the segment before it. A `..` with nothing left to remove is
/// kept for relative paths (so containment checks still see it) and dropped
/// for absolute ones. The result never has a trailing slash.
///
/// Idempotent: `normalize(&normalize(p)) == normalize(p)`.
#[must_use]
pub fn normalize(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Converts a canonical path to the platform form for filesystem access.
#[must_use]
pub fn denormalize(path: &str) -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(path.replace('/', "\\"))
    } else {
        PathBuf::from(path)
    }
}

/// Normalizes a filesystem path lexically, without touching the disk.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            c => components.push(c),
        }
    }

    components.iter().collect()
}

/// Resolves `target` against the real casing on disk.
///
/// If `target` exists verbatim it is returned as is. Otherwise its parent is
/// resolved the same way and scanned for an entry whose name matches the final
/// component case-insensitively. When nothing matches, the (resolved) parent
/// joined with the original file name is returned, which for a parent that
/// exists verbatim is the original path: the signal that it is safe to create
/// the file there. Never fails; unreadable directories fall back to the input.
#[must_use]
pub fn find_actual_case(target: &Path) -> PathBuf {
    if target.exists() {
        return target.to_path_buf();
    }

    let (Some(parent), Some(name)) = (target.parent(), target.file_name()) else {
        return target.to_path_buf();
    };
    if parent.as_os_str().is_empty() {
        return target.to_path_buf();
    }

    let parent = find_actual_case(parent);
    let wanted = name.to_string_lossy().to_lowercase();

    let Ok(entries) = std::fs::read_dir(&parent) else {
        return parent.join(name);
    };

    for entry in entries.flatten() {
        let actual = entry.file_name();
        if actual.to_string_lossy().to_lowercase() == wanted {
            return parent.join(actual);
        }
    }

    parent.join(name)
}

/// Lexical check that `target` is strictly beneath `root`.
#[must_use]
pub fn is_within_root(root: &Path, target: &Path) -> bool {
    let root = lexical_normalize(root);
    let target = lexical_normalize(target);
    target != root && target.starts_with(&root)
}

/// Checks that the nearest existing ancestor of `target` does not leave `root`
/// once symlinks are resolved.
fn contained_on_disk(root: &Path, target: &Path) -> bool {
    let Ok(canonical_root) = root.canonicalize() else {
        // Root not created yet; nothing on disk can redirect the write.
        return true;
    };

    let mut ancestor = Some(target);
    while let Some(candidate) = ancestor {
        if candidate.exists() {
            return match candidate.canonicalize() {
                Ok(canonical) => canonical.starts_with(&canonical_root),
                Err(_) => true,
            };
        }
        ancestor = candidate.parent();
    }
    true
}

/// Resolves the on-disk target of a manifest path and enforces containment.
///
/// The path is normalized, converted to platform form, joined to `root`,
/// case-resolved with [`find_actual_case`] and finally checked with
/// [`is_within_root`] plus a symlink-aware check of its nearest existing
/// ancestor.
///
/// # Errors
///
/// [`UpdateError::PathTraversal`] when the target is empty, absolute, or ends
/// up anywhere other than strictly beneath `root`.
pub fn resolve_target(root: &Path, name: &str) -> Result<PathBuf> {
    let normalized = normalize(name);
    let joined = root.join(denormalize(&normalized));

    if normalized.is_empty() || !is_within_root(root, &joined) {
        return Err(UpdateError::PathTraversal {
            path: name.to_string(),
        });
    }

    let target = find_actual_case(&joined);
    if !is_within_root(root, &target) || !contained_on_disk(root, &target) {
        return Err(UpdateError::PathTraversal {
            path: name.to_string(),
        });
    }

    if target != joined {
        debug!("Resolved {} to existing {}", normalized, target.display());
    }
    Ok(target)
}
