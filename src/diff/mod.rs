//! Plan computation: what to fetch and what to remove.
//!
//! [`compute_plan`] reconciles the local manifest with a remote manifest. Hash
//! equality is the only test for "unchanged": no timestamps, no sizes. Remote
//! entries matching the user's exclusions are skipped outright, and local
//! entries the remote no longer lists are scheduled for removal.
//!
//! The plan is pure data. Nothing here touches the filesystem or fails.
//!
//! # Examples
//!
//! ```rust
//! use mudsync::diff::compute_plan;
//! use mudsync::manifest::{FileRecord, Manifest};
//! use mudsync::policy::ExclusionSet;
//!
//! let local: Manifest = [FileRecord::new("x", "H1", "u/x")].into_iter().collect();
//! let remote: Manifest =
//!     [FileRecord::new("x", "H1", "u/x"), FileRecord::new("y", "H2", "u/y")].into_iter().collect();
//!
//! let plan = compute_plan(&local, &remote, &ExclusionSet::new());
//! assert_eq!(plan.fetch_names(), vec!["y"]);
//! assert!(plan.to_delete.is_empty());
//! ```

use crate::manifest::{FileRecord, Manifest};
use crate::policy::ExclusionSet;
use std::collections::BTreeSet;
use tracing::debug;

/// What an apply pass has to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePlan {
    /// Records to download, in sorted path order.
    pub to_fetch: Vec<FileRecord>,
    /// Normalized paths to remove, in sorted order.
    pub to_delete: Vec<String>,
    /// Subset of `to_fetch` that does not exist in the local manifest.
    new_files: BTreeSet<String>,
}

impl UpdatePlan {
    /// `true` when there is nothing to fetch and nothing to delete.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_fetch.is_empty() && self.to_delete.is_empty()
    }

    /// Whether a fetched path is new rather than changed.
    #[must_use]
    pub fn is_new(&self, path: &str) -> bool {
        self.new_files.contains(path)
    }

    /// Number of fetches that add files.
    #[must_use]
    pub fn added_count(&self) -> usize {
        self.new_files.len()
    }

    /// Number of fetches that replace changed files.
    #[must_use]
    pub fn changed_count(&self) -> usize {
        self.to_fetch.len() - self.new_files.len()
    }

    /// Names of the records to fetch.
    #[must_use]
    pub fn fetch_names(&self) -> Vec<&str> {
        self.to_fetch.iter().map(|record| record.name.as_str()).collect()
    }
}

/// Computes the plan that converges `local` onto `remote`.
///
/// 1. Local keys are re-normalized (the file may have been edited by hand).
/// 2. Each remote entry is skipped if excluded, fetched if absent locally or
///    if its hash differs, and left alone otherwise.
/// 3. Each local path missing from the remote is scheduled for deletion.
#[must_use]
pub fn compute_plan(local: &Manifest, remote: &Manifest, exclusions: &ExclusionSet) -> UpdatePlan {
    let local = local.normalized();
    let mut plan = UpdatePlan::default();

    for (path, remote_record) in remote.iter() {
        if exclusions.matches(path) {
            debug!("Skipping excluded path {}", path);
            continue;
        }

        match local.get(path) {
            None => {
                plan.new_files.insert(path.clone());
                plan.to_fetch.push(remote_record.clone());
            }
            Some(local_record) if local_record.hash != remote_record.hash => {
                plan.to_fetch.push(remote_record.clone());
            }
            Some(_) => {}
        }
    }

    plan.to_delete = local.paths().filter(|path| !remote.contains(path)).cloned().collect();

    debug!(
        "Plan: {} new, {} changed, {} removed",
        plan.added_count(),
        plan.changed_count(),
        plan.to_delete.len()
    );
    plan
}

/// The manifest to persist once a plan has been applied successfully.
///
/// Non-excluded remote entries are taken from `remote`. For excluded paths the
/// existing local record is carried over, so a file the user pinned keeps the
/// hash of the content actually on disk.
#[must_use]
pub fn next_manifest(local: &Manifest, remote: &Manifest, exclusions: &ExclusionSet) -> Manifest {
    let local = local.normalized();
    let mut next = Manifest::new();

    for (path, remote_record) in remote.iter() {
        if exclusions.matches(path) {
            if let Some(local_record) = local.get(path) {
                next.insert(local_record.clone());
            }
        } else {
            next.insert(remote_record.clone());
        }
    }

    next
}
