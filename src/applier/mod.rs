//! Applying an [`UpdatePlan`] to the installation directory.
//!
//! The applier is the only component that writes distributed files. A pass
//! runs in four steps, always in this order:
//!
//! 1. **Validate**: every fetch and delete target is resolved under the root
//!    with [`resolve_target`]. One escaping path fails the whole pass with
//!    [`UpdateError::PathTraversal`] before anything is written.
//! 2. **Transfer**: either per-file ([`ApplyMode::PerFile`]: bounded
//!    concurrent downloads) or bulk ([`ApplyMode::Bulk`]: one archive,
//!    extracted sequentially). Existing user-config files are never
//!    overwritten in either mode.
//! 3. **Quarantine**: files removed upstream are moved into `.old/`.
//!    Failures here are reported, never fatal.
//! 4. **Persist**: the target manifest is saved, filtered to the files that
//!    are actually on disk.
//!
//! Steps 3 and 4 only start once every transfer of step 2 has completed, and
//! only if all of them succeeded. The applier never retries; retries belong to
//! the [`Transport`].

mod bulk;
mod per_file;
mod quarantine;

use crate::constants::{DEFAULT_BULK_THRESHOLD, DEFAULT_MAX_PARALLEL};
use crate::core::Result;
use crate::diff::UpdatePlan;
use crate::manifest::{self, FileRecord, Manifest};
use crate::policy::{ExclusionSet, resolve_target};
use crate::transport::Transport;
use crate::utils::progress::{ProgressEvent, ProgressSink};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Which archive entries a bulk pass extracts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractScope {
    /// Fresh install: every entry not excluded.
    Everything,
    /// Large differential update: exactly these normalized paths. An empty set extracts nothing.
    Only(BTreeSet<String>),
}

/// How a plan is transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyMode {
    PerFile,
    Bulk(ExtractScope),
}

impl ApplyMode {
    /// Picks the transfer mode for a plan.
    ///
    /// Bulk mode is used for fresh installs and for plans with more than
    /// `bulk_threshold` fetches, but only when an archive is available.
    #[must_use]
    pub fn select(plan: &UpdatePlan, fresh: bool, bulk_threshold: usize, archive_available: bool) -> Self {
        if !archive_available {
            return Self::PerFile;
        }
        if fresh {
            Self::Bulk(ExtractScope::Everything)
        } else if plan.to_fetch.len() > bulk_threshold {
            Self::Bulk(ExtractScope::Only(plan.to_fetch.iter().map(|record| record.name.clone()).collect()))
        } else {
            Self::PerFile
        }
    }
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerFile => write!(f, "per-file"),
            Self::Bulk(ExtractScope::Everything) => write!(f, "bulk (full install)"),
            Self::Bulk(ExtractScope::Only(paths)) => write!(f, "bulk ({} files)", paths.len()),
        }
    }
}

/// Tuning for an apply pass.
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Concurrent per-file transfers.
    pub max_parallel: usize,
    /// Fetch count above which a differential update goes through the archive.
    pub bulk_threshold: usize,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
            bulk_threshold: DEFAULT_BULK_THRESHOLD,
        }
    }
}

/// What an apply pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Mode actually used.
    pub mode: Option<ApplyMode>,
    /// Paths written, sorted.
    pub fetched: Vec<String>,
    /// Existing user-config paths left untouched, sorted.
    pub preserved: Vec<String>,
    /// Paths moved into `.old/`, sorted.
    pub quarantined: Vec<String>,
    /// Paths that could not be quarantined, with the reason.
    pub quarantine_failures: Vec<(String, String)>,
    /// Entries written to the persisted manifest.
    pub manifest_entries: usize,
}

/// Applies plans to one installation root.
pub struct UpdateApplier<T: Transport> {
    root: PathBuf,
    transport: Arc<T>,
    options: ApplyOptions,
    exclusions: ExclusionSet,
    progress: Arc<dyn ProgressSink>,
}

impl<T: Transport> UpdateApplier<T> {
    pub fn new(root: impl Into<PathBuf>, transport: Arc<T>, progress: Arc<dyn ProgressSink>) -> Self {
        Self {
            root: root.into(),
            transport,
            options: ApplyOptions::default(),
            exclusions: ExclusionSet::new(),
            progress,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ApplyOptions) -> Self {
        self.options = options;
        self
    }

    /// Exclusions honored when extracting a full archive.
    #[must_use]
    pub fn with_exclusions(mut self, exclusions: ExclusionSet) -> Self {
        self.exclusions = exclusions;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn options(&self) -> &ApplyOptions {
        &self.options
    }

    /// Runs one pass: validate, transfer, quarantine, persist `next_manifest`.
    ///
    /// `archive_url` is required for [`ApplyMode::Bulk`]; without it the pass
    /// falls back to per-file transfers.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::PathTraversal`](crate::core::UpdateError::PathTraversal)
    ///   if any target escapes the root (nothing is written)
    /// - [`UpdateError::AggregateFailure`](crate::core::UpdateError::AggregateFailure)
    ///   if per-file transfers failed
    /// - transfer, archive or I/O errors from bulk mode and manifest saving
    pub async fn apply(
        &self,
        plan: &UpdatePlan,
        mode: ApplyMode,
        archive_url: Option<&str>,
        next_manifest: &Manifest,
    ) -> Result<ApplyReport> {
        let fetch_targets = self.resolve_fetches(&plan.to_fetch)?;
        let delete_targets = self.resolve_deletes(&plan.to_delete)?;

        let mode = match (mode, archive_url) {
            (ApplyMode::Bulk(_), None) => {
                warn!("No archive available for bulk mode, falling back to per-file transfers");
                ApplyMode::PerFile
            }
            (mode, _) => mode,
        };
        info!("Applying {} fetches and {} removals ({})", fetch_targets.len(), delete_targets.len(), mode);

        let mut report = ApplyReport::default();

        let transferred = match (&mode, archive_url) {
            (ApplyMode::Bulk(scope), Some(url)) => {
                bulk::run(
                    &self.root,
                    self.transport.as_ref(),
                    url,
                    scope,
                    &self.exclusions,
                    Arc::clone(&self.progress),
                )
                .await?
            }
            _ => {
                per_file::run(
                    Arc::clone(&self.transport),
                    fetch_targets,
                    self.options.max_parallel,
                    Arc::clone(&self.progress),
                )
                .await?
            }
        };
        report.fetched = transferred.fetched;
        report.preserved = transferred.preserved;

        let quarantined = quarantine::run(&self.root, &delete_targets, self.progress.as_ref());
        report.quarantined = quarantined.moved;
        report.quarantine_failures = quarantined.failures;

        report.manifest_entries = manifest::save(&self.root, next_manifest)?;
        report.mode = Some(mode);
        self.progress.emit(ProgressEvent::Finished);

        info!(
            "Applied: {} fetched, {} preserved, {} quarantined, {} quarantine failures",
            report.fetched.len(),
            report.preserved.len(),
            report.quarantined.len(),
            report.quarantine_failures.len()
        );
        Ok(report)
    }

    fn resolve_fetches(&self, records: &[FileRecord]) -> Result<Vec<(FileRecord, PathBuf)>> {
        records
            .iter()
            .map(|record| resolve_target(&self.root, &record.name).map(|target| (record.clone(), target)))
            .collect()
    }

    fn resolve_deletes(&self, paths: &[String]) -> Result<Vec<(String, PathBuf)>> {
        paths.iter().map(|path| resolve_target(&self.root, path).map(|target| (path.clone(), target))).collect()
    }
}

/// Files written and files preserved by a transfer step.
#[derive(Debug, Default)]
struct Transferred {
    fetched: Vec<String>,
    preserved: Vec<String>,
}
