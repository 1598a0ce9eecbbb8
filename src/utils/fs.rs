//! Filesystem helpers shared by the manifest store and the applier.
//!
//! Writes that replace persisted state go through [`atomic_write`]; moves into
//! quarantine go through [`move_file`], which falls back to copy-and-delete
//! when a rename is not possible.

use crate::core::{Result, UpdateError};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Ensures a directory exists, creating it and its parents if necessary.
///
/// # Errors
///
/// Fails if the directory cannot be created or the path exists as a file.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| UpdateError::io("Creating directory", path, e))?;
    } else if !path.is_dir() {
        return Err(UpdateError::io(
            "Creating directory",
            path,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "path exists but is not a directory"),
        ));
    }
    Ok(())
}

/// Ensures that the parent directory of a file path exists.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    Ok(())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// 1. Writes content to `<file name>.tmp` next to the target
/// 2. Syncs the temporary file to disk
/// 3. Renames it over the target
///
/// Readers see either the old content or the new content, never a mix.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    ensure_parent_dir(path)?;

    let mut temp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    {
        let mut file = fs::File::create(&temp_path)
            .map_err(|e| UpdateError::io("Creating temp file", &temp_path, e))?;
        file.write_all(content).map_err(|e| UpdateError::io("Writing temp file", &temp_path, e))?;
        file.sync_all().map_err(|e| UpdateError::io("Syncing temp file", &temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        UpdateError::io("Replacing file", path, e)
    })?;

    Ok(())
}

/// Moves a file, replacing anything already at the destination.
///
/// Tries a rename first and falls back to copy + remove (for example across
/// volumes).
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    ensure_parent_dir(to)?;

    if to.is_dir() {
        fs::remove_dir_all(to).map_err(|e| UpdateError::io("Clearing destination", to, e))?;
    } else if to.exists() {
        fs::remove_file(to).map_err(|e| UpdateError::io("Clearing destination", to, e))?;
    }

    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    debug!("Rename failed, copying {} to {}", from.display(), to.display());
    fs::copy(from, to).map_err(|e| UpdateError::io("Copying file", from, e))?;
    fs::remove_file(from).map_err(|e| UpdateError::io("Removing file", from, e))?;
    Ok(())
}

/// Removes empty directories from `start` upwards, stopping at `stop_at`.
///
/// Best-effort: the first non-empty or unremovable directory ends the walk.
pub fn prune_empty_dirs(start: &Path, stop_at: &Path) {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir == stop_at || !dir.starts_with(stop_at) {
            break;
        }
        let is_empty = fs::read_dir(dir).map(|mut entries| entries.next().is_none()).unwrap_or(false);
        if !is_empty || fs::remove_dir(dir).is_err() {
            break;
        }
        debug!("Removed empty directory {}", dir.display());
        current = dir.parent();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_parents_and_replaces() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join(".manifest");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!temp.path().join("nested").join(".manifest.tmp").exists());
    }

    #[test]
    fn test_ensure_dir_rejects_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        fs::write(&file, "x").unwrap();
        assert!(ensure_dir(&file).is_err());
        assert!(ensure_dir(&temp.path().join("a").join("b")).is_ok());
    }

    #[test]
    fn test_move_file_replaces_destination() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("a.txt");
        let to = temp.path().join("q").join("a.txt");
        fs::write(&from, "new").unwrap();
        fs::create_dir_all(to.parent().unwrap()).unwrap();
        fs::write(&to, "old").unwrap();

        move_file(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "new");
    }

    #[test]
    fn test_prune_empty_dirs_stops_at_root_and_non_empty() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("a").join("b").join("c")).unwrap();
        fs::write(root.join("a").join("keep.txt"), "x").unwrap();

        prune_empty_dirs(&root.join("a").join("b").join("c"), root);

        assert!(!root.join("a").join("b").exists());
        assert!(root.join("a").exists());
        assert!(root.exists());
    }
}
