//! Catalog served from a mirror directory on the local filesystem.
//!
//! The mirror is either laid out per ref (`<root>/main`, `<root>/dev`) or as
//! a single tree used for every ref. Hashes are git-style blob ids computed
//! with SHA-256, so a file that does not change between runs keeps its hash.

use super::{CatalogEntry, RemoteCatalog};
use crate::core::{Result, UpdateError};
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct LocalCatalog {
    root: PathBuf,
}

impl LocalCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Directory holding the files for `git_ref`.
    pub fn ref_dir(&self, git_ref: &str) -> PathBuf {
        let per_ref = self.root.join(git_ref);
        if !git_ref.is_empty() && per_ref.is_dir() {
            per_ref
        } else {
            self.root.clone()
        }
    }

    fn file_url(path: &Path) -> String {
        Url::from_file_path(path)
            .map(|url| url.to_string())
            .unwrap_or_else(|()| format!("file://{}", path.display()))
    }
}

/// Git-style blob id over SHA-256: `sha256("blob <len>\0" + content)`.
pub fn blob_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("blob {}\0", content.len()).as_bytes());
    hasher.update(content);
    hex::encode(hasher.finalize())
}

impl RemoteCatalog for LocalCatalog {
    async fn get_tree(&self, git_ref: &str) -> Result<Vec<CatalogEntry>> {
        let dir = self.ref_dir(git_ref);
        let git_ref = git_ref.to_string();

        tokio::task::spawn_blocking(move || walk_mirror(&dir, &git_ref))
            .await
            .map_err(|e| UpdateError::Catalog {
                git_ref: "local".to_string(),
                reason: format!("listing task failed: {e}"),
            })?
    }

    fn raw_url(&self, git_ref: &str, path: &str) -> String {
        let mut target = self.ref_dir(git_ref);
        target.extend(path.split('/'));
        Self::file_url(&target)
    }

    fn archive_url(&self, _git_ref: &str) -> Option<String> {
        None
    }
}

fn walk_mirror(dir: &Path, git_ref: &str) -> Result<Vec<CatalogEntry>> {
    if !dir.is_dir() {
        return Err(UpdateError::Catalog {
            git_ref: git_ref.to_string(),
            reason: format!("mirror directory {} does not exist", dir.display()),
        });
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| UpdateError::Catalog {
            git_ref: git_ref.to_string(),
            reason: e.to_string(),
        })?;

        let relative = match entry.path().strip_prefix(dir) {
            Ok(relative) => relative.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };

        if entry.file_type().is_dir() {
            entries.push(CatalogEntry::tree(relative));
        } else if entry.file_type().is_file() {
            let content =
                std::fs::read(entry.path()).map_err(|e| UpdateError::io("Reading mirror file", entry.path(), e))?;
            entries.push(CatalogEntry::blob(relative, blob_hash(&content)));
        }
    }

    debug!("Local mirror {} lists {} entries", dir.display(), entries.len());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EntryKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_blob_hash_depends_on_length_header() {
        assert_eq!(blob_hash(b"hello"), blob_hash(b"hello"));
        assert_ne!(blob_hash(b"hello"), blob_hash(b"hello\n"));
        assert_eq!(blob_hash(b"").len(), 64);
    }

    #[tokio::test]
    async fn test_get_tree_lists_files_and_dirs() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("scripts")).unwrap();
        fs::write(temp.path().join("scripts/main.lua"), "print(1)").unwrap();
        fs::write(temp.path().join("readme.txt"), "hi").unwrap();

        let catalog = LocalCatalog::new(temp.path());
        let entries = catalog.get_tree("main").await.unwrap();

        let blobs: Vec<_> = entries.iter().filter(|e| e.kind == EntryKind::Blob).map(|e| e.path.as_str()).collect();
        assert_eq!(blobs, vec!["readme.txt", "scripts/main.lua"]);
        assert!(entries.iter().any(|e| e.kind == EntryKind::Tree && e.path == "scripts"));

        let main = entries.iter().find(|e| e.path == "scripts/main.lua").unwrap();
        assert_eq!(main.hash, blob_hash(b"print(1)"));
    }

    #[tokio::test]
    async fn test_per_ref_directory_is_preferred() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("dev")).unwrap();
        fs::write(temp.path().join("dev/only-dev.txt"), "d").unwrap();
        fs::write(temp.path().join("top.txt"), "t").unwrap();

        let catalog = LocalCatalog::new(temp.path());
        let dev: Vec<_> = catalog.get_tree("dev").await.unwrap().into_iter().map(|e| e.path).collect();
        assert_eq!(dev, vec!["only-dev.txt"]);

        assert_eq!(catalog.ref_dir("main"), temp.path());
    }

    #[tokio::test]
    async fn test_missing_mirror_is_catalog_error() {
        let temp = TempDir::new().unwrap();
        let catalog = LocalCatalog::new(temp.path().join("nope"));
        assert!(matches!(catalog.get_tree("main").await, Err(UpdateError::Catalog { .. })));
    }

    #[test]
    fn test_raw_url_is_file_url_without_archive() {
        let temp = TempDir::new().unwrap();
        let catalog = LocalCatalog::new(temp.path());
        let url = catalog.raw_url("main", "a/b.txt");
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("/a/b.txt"));
        assert!(catalog.archive_url("main").is_none());
    }
}
