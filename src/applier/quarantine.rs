//! Moving files removed upstream into `.old/`.

use crate::constants::QUARANTINE_DIR;
use crate::policy::{denormalize, is_user_config};
use crate::utils::fs::{move_file, prune_empty_dirs};
use crate::utils::progress::{Phase, ProgressEvent, ProgressSink};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub(super) struct Quarantined {
    pub(super) moved: Vec<String>,
    pub(super) failures: Vec<(String, String)>,
}

/// Quarantines each `(path, target)`. Never fails as a whole.
///
/// Missing files are skipped silently and existing user-config files are left
/// in place. An earlier quarantined copy of the same path is replaced.
pub(super) fn run(root: &Path, targets: &[(String, PathBuf)], progress: &dyn ProgressSink) -> Quarantined {
    let mut outcome = Quarantined::default();
    if targets.is_empty() {
        return outcome;
    }

    progress.emit(ProgressEvent::Phase(Phase::Quarantining {
        total: targets.len(),
    }));

    let quarantine_root = root.join(QUARANTINE_DIR);
    for (path, target) in targets {
        if !target.is_file() {
            debug!("Nothing to quarantine for {}", path);
            continue;
        }
        if is_user_config(path) {
            debug!("Leaving user configuration {} in place", path);
            continue;
        }

        let destination = quarantine_root.join(denormalize(path));
        match move_file(target, &destination) {
            Ok(()) => {
                debug!("Quarantined {} to {}", path, destination.display());
                outcome.moved.push(path.clone());
                if let Some(parent) = target.parent() {
                    prune_empty_dirs(parent, root);
                }
            }
            Err(e) => {
                warn!("Could not quarantine {}: {}", path, e);
                outcome.failures.push((path.clone(), e.to_string()));
            }
        }
    }

    outcome.moved.sort();
    outcome
}
