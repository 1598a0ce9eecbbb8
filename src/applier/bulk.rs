//! Bulk mode: one archive download, sequential extraction.

use super::{ExtractScope, Transferred};
use crate::core::{Result, UpdateError};
use crate::manifest::is_builtin_excluded;
use crate::policy::{ExclusionSet, is_user_config, normalize, resolve_target};
use crate::transport::Transport;
use crate::utils::progress::{PercentThrottle, Phase, ProgressEvent, ProgressSink};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use zip::ZipArchive;

/// Name of the staged archive inside its temporary directory.
const STAGED_ARCHIVE: &str = "snapshot.zip";

pub(super) async fn run<T: Transport>(
    root: &Path,
    transport: &T,
    archive_url: &str,
    scope: &ExtractScope,
    exclusions: &ExclusionSet,
    progress: Arc<dyn ProgressSink>,
) -> Result<Transferred> {
    let staging = tempfile::Builder::new()
        .prefix("mudsync-")
        .tempdir()
        .map_err(|e| UpdateError::io("Creating staging directory", std::env::temp_dir(), e))?;
    let archive_path = staging.path().join(STAGED_ARCHIVE);

    progress.emit(ProgressEvent::Phase(Phase::DownloadingArchive));
    transport.fetch_archive(archive_url, &archive_path, progress.as_ref()).await?;

    let root = root.to_path_buf();
    let scope = scope.clone();
    let exclusions = exclusions.clone();
    let task_archive = archive_path.clone();

    let extracted =
        tokio::task::spawn_blocking(move || extract(&root, &task_archive, &scope, &exclusions, progress.as_ref()))
            .await
            .map_err(|e| UpdateError::Archive {
                path: archive_path.clone(),
                reason: format!("extraction task failed: {e}"),
            })??;

    // Staging directory is removed when `staging` drops.
    Ok(extracted)
}

/// One archive entry selected for extraction.
struct Selected {
    index: usize,
    path: String,
    target: PathBuf,
    is_dir: bool,
}

/// Extracts `archive` into `root`.
///
/// Every selected entry is containment-checked before the first byte is
/// written.
pub(crate) fn extract(
    root: &Path,
    archive: &Path,
    scope: &ExtractScope,
    exclusions: &ExclusionSet,
    progress: &dyn ProgressSink,
) -> Result<Transferred> {
    let archive_error = |reason: String| UpdateError::Archive {
        path: archive.to_path_buf(),
        reason,
    };

    let file = File::open(archive).map_err(|e| UpdateError::io("Opening archive", archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| archive_error(e.to_string()))?;

    let mut names = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        let entry = zip.by_index_raw(index).map_err(|e| archive_error(e.to_string()))?;
        names.push((entry.name().replace('\\', "/"), entry.is_dir()));
    }

    let prefix = common_prefix(names.iter().map(|(name, _)| name.as_str()));
    if let Some(prefix) = &prefix {
        debug!("Stripping archive top-level directory {}", prefix);
    }

    let mut selected = Vec::new();
    let mut preserved = Vec::new();
    for (index, (name, is_dir)) in names.iter().enumerate() {
        let stripped = match &prefix {
            Some(prefix) => name.strip_prefix(prefix.as_str()).unwrap_or(name),
            None => name.as_str(),
        };
        let path = normalize(stripped);
        if path.is_empty() {
            continue;
        }

        let wanted = match scope {
            ExtractScope::Only(paths) => !is_dir && paths.contains(&path),
            ExtractScope::Everything => !is_builtin_excluded(&path) && !exclusions.matches(&path),
        };
        if !wanted {
            continue;
        }

        let target = resolve_target(root, &path)?;
        if !is_dir && is_user_config(&path) && target.exists() {
            debug!("Keeping user configuration {}", path);
            preserved.push(path);
            continue;
        }
        selected.push(Selected {
            index,
            path,
            target,
            is_dir: *is_dir,
        });
    }

    let files = selected.iter().filter(|entry| !entry.is_dir).count();
    progress.emit(ProgressEvent::Phase(Phase::Extracting {
        total: files,
    }));

    let throttle = PercentThrottle::new();
    let mut fetched = Vec::with_capacity(files);
    for entry in selected {
        if entry.is_dir {
            std::fs::create_dir_all(&entry.target)
                .map_err(|e| UpdateError::io("Creating directory", &entry.target, e))?;
            continue;
        }

        if let Some(parent) = entry.target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| UpdateError::io("Creating directory", parent, e))?;
        }

        let mut source = zip.by_index(entry.index).map_err(|e| archive_error(e.to_string()))?;
        let mut out =
            File::create(&entry.target).map_err(|e| UpdateError::io("Writing file", &entry.target, e))?;
        std::io::copy(&mut source, &mut out).map_err(|e| UpdateError::io("Extracting file", &entry.target, e))?;

        debug!("Extracted {}", entry.path);
        fetched.push(entry.path);
        if let Some(percent) = throttle.update(fetched.len() as u64, files as u64) {
            progress.emit(ProgressEvent::Extracted {
                done: fetched.len(),
                total: files,
                percent,
            });
        }
    }

    fetched.sort();
    preserved.sort();
    Ok(Transferred {
        fetched,
        preserved,
    })
}

/// Top-level directory shared by every entry, as `"name/"`.
///
/// The candidate comes from the first entry; it is only returned when every
/// entry starts with it.
pub(crate) fn common_prefix<'a>(mut names: impl Iterator<Item = &'a str> + Clone) -> Option<String> {
    let first = names.clone().next()?;
    let (top, _) = first.split_once('/')?;
    if top.is_empty() || top == "." || top == ".." {
        return None;
    }
    let prefix = format!("{top}/");
    names.all(|name| name.starts_with(&prefix)).then_some(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_prefix_requires_every_entry() {
        let shared = ["dist-main/", "dist-main/a.txt", "dist-main/lua/b.lua"];
        assert_eq!(common_prefix(shared.iter().copied()).as_deref(), Some("dist-main/"));

        let mixed = ["dist-main/a.txt", "other/b.txt"];
        assert_eq!(common_prefix(mixed.iter().copied()), None);

        let flat = ["a.txt", "lua/b.lua"];
        assert_eq!(common_prefix(flat.iter().copied()), None);
    }

    #[test]
    fn test_common_prefix_ignores_dot_segments() {
        let names = ["../a.txt", "../b.txt"];
        assert_eq!(common_prefix(names.iter().copied()), None);
    }
}
