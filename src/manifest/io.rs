//! Loading and saving the local manifest dotfile.

use super::Manifest;
use crate::constants::MANIFEST_FILE;
use crate::core::{Result, UpdateError};
use crate::policy::resolve_target;
use crate::utils::fs::atomic_write;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Loads the local manifest from `<root>/.manifest`.
///
/// # Errors
///
/// - [`UpdateError::NotFound`] when the file does not exist
/// - [`UpdateError::ParseError`] when the content is not a valid manifest
///   after comment lines are removed
/// - [`UpdateError::Io`] for any other read failure
pub fn load_local(root: &Path) -> Result<Manifest> {
    let path = root.join(MANIFEST_FILE);

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(UpdateError::NotFound {
                what: "Manifest",
                path,
            });
        }
        Err(e) => return Err(UpdateError::io("Reading manifest", path, e)),
    };

    let manifest = parse(&content, &path)?;
    debug!("Loaded {} manifest entries from {}", manifest.len(), path.display());
    Ok(manifest)
}

/// Parses manifest content, stripping `//` and `#` comment lines first.
///
/// `file` is only used in error messages.
pub fn parse(content: &str, file: &Path) -> Result<Manifest> {
    let stripped: String = content
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            !(trimmed.starts_with("//") || trimmed.starts_with('#'))
        })
        .collect::<Vec<_>>()
        .join("\n");

    let manifest: Manifest = serde_json::from_str(&stripped).map_err(|e| UpdateError::ParseError {
        file: file.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(manifest.normalized())
}

/// Writes `manifest` as the complete replacement of `<root>/.manifest`.
///
/// Only entries whose file currently exists under `root` are written; the rest
/// are dropped silently. Output has sorted keys and two-space indentation, and
/// the write is atomic.
///
/// Returns the number of entries written.
pub fn save(root: &Path, manifest: &Manifest) -> Result<usize> {
    let mut present = manifest.clone();
    present.retain(|path, _| resolve_target(root, path).map(|target| target.is_file()).unwrap_or(false));

    let dropped = manifest.len() - present.len();
    if dropped > 0 {
        debug!("Dropping {} manifest entries with no file on disk", dropped);
    }

    let path = root.join(MANIFEST_FILE);
    let mut content = serde_json::to_string_pretty(&present).map_err(|e| UpdateError::ParseError {
        file: path.clone(),
        reason: e.to_string(),
    })?;
    content.push('\n');

    atomic_write(&path, content.as_bytes())?;
    debug!("Saved {} manifest entries to {}", present.len(), path.display());
    Ok(present.len())
}
