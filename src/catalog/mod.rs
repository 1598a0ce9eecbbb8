//! Remote catalogs: where the list of distributed files comes from.
//!
//! A [`RemoteCatalog`] answers three questions for a repository ref:
//!
//! - which entries exist at that ref ([`RemoteCatalog::get_tree`])
//! - where the content of one entry can be downloaded ([`RemoteCatalog::raw_url`])
//! - whether the whole ref can be downloaded as one archive ([`RemoteCatalog::archive_url`])
//!
//! Two implementations ship with the crate: [`GitHubCatalog`] talks to a
//! GitHub-style git tree API, and [`LocalCatalog`] serves a mirror directory
//! on disk, which is what the integration tests and offline installs use.
//!
//! [`build_remote_manifest`] turns a catalog listing into the remote
//! [`Manifest`] the diff engine consumes.

pub mod github;
pub mod local;

pub use github::GitHubCatalog;
pub use local::LocalCatalog;

use crate::core::Result;
use crate::manifest::{FileRecord, Manifest, is_builtin_excluded};
use crate::policy::normalize;
use std::future::Future;
use tracing::debug;

/// Kind of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A file.
    Blob,
    /// A directory.
    Tree,
}

/// One entry of a catalog listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Path relative to the repository root, as the catalog reports it.
    pub path: String,
    pub kind: EntryKind,
    /// Content hash for blobs. Directories may carry anything.
    pub hash: String,
}

impl CatalogEntry {
    pub fn blob(path: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Blob,
            hash: hash.into(),
        }
    }

    pub fn tree(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Tree,
            hash: String::new(),
        }
    }
}

/// Source of truth for the distributed file set.
pub trait RemoteCatalog: Send + Sync {
    /// Lists every entry reachable from `git_ref`.
    fn get_tree(&self, git_ref: &str) -> impl Future<Output = Result<Vec<CatalogEntry>>> + Send;

    /// Download URL for one file at `git_ref`.
    fn raw_url(&self, git_ref: &str, path: &str) -> String;

    /// Download URL for the whole ref as a zip archive, if the catalog offers one.
    fn archive_url(&self, git_ref: &str) -> Option<String>;
}

/// Builds the remote manifest from a catalog listing.
///
/// Directories are dropped, paths are normalized, built-in exclusions are
/// removed and every record gets its download URL from `catalog`.
pub fn build_remote_manifest<C: RemoteCatalog>(
    entries: &[CatalogEntry],
    catalog: &C,
    git_ref: &str,
) -> Manifest {
    let mut manifest = Manifest::new();
    let mut skipped = 0usize;

    for entry in entries.iter().filter(|entry| entry.kind == EntryKind::Blob) {
        let path = normalize(&entry.path);
        if path.is_empty() || is_builtin_excluded(&path) {
            skipped += 1;
            continue;
        }
        let url = catalog.raw_url(git_ref, &path);
        manifest.insert(FileRecord::new(&path, entry.hash.clone(), url));
    }

    debug!("Remote manifest for {}: {} files ({} built-in exclusions)", git_ref, manifest.len(), skipped);
    manifest
}
