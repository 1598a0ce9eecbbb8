//! The update session: check, plan, apply, persist.
//!
//! An [`Updater`] ties one [`UpdaterConfig`] to a catalog, a transport and a
//! progress sink. [`Updater::check`] computes what would change without
//! touching the installation. [`Updater::update`] takes the installation
//! lock and then runs the whole pass:
//!
//! ```text
//! lock -> local manifest -> exclusions -> catalog -> plan -> apply -> changelog
//! ```
//!
//! A missing local manifest means a fresh install. An unreadable one is
//! treated the same way (with a warning) and regenerated by the pass.

use crate::applier::{ApplyMode, ApplyReport, UpdateApplier};
use crate::catalog::{RemoteCatalog, build_remote_manifest};
use crate::changelog::{Changelog, ChangelogBuilder};
use crate::config::UpdaterConfig;
use crate::constants::EXCLUSIONS_FILE;
use crate::core::{Result, UpdateError};
use crate::diff::{UpdatePlan, compute_plan, next_manifest};
use crate::lock::InstallLock;
use crate::manifest::{self, Manifest};
use crate::policy::ExclusionSet;
use crate::transport::Transport;
use crate::utils::progress::{Phase, ProgressEvent, ProgressSink};
use chrono::Local;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a dry run.
#[derive(Debug, Clone)]
pub struct UpdateCheck {
    /// Ref the check ran against.
    pub git_ref: String,
    /// Whether the installation has no usable manifest (or a full install was requested).
    pub fresh: bool,
    pub plan: UpdatePlan,
    pub remote: Manifest,
    /// Mode an update would use.
    pub mode: ApplyMode,
}

impl UpdateCheck {
    /// Whether an update would change anything.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.fresh || !self.plan.is_empty()
    }
}

/// Result of a completed update.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub git_ref: String,
    pub plan: UpdatePlan,
    /// `None` when nothing had to be transferred.
    pub report: Option<ApplyReport>,
    pub changelog: Changelog,
}

/// Snapshot of everything a plan is computed from.
struct Snapshot {
    git_ref: String,
    fresh: bool,
    local: Manifest,
    remote: Manifest,
    exclusions: ExclusionSet,
    plan: UpdatePlan,
}

/// One update session for one installation.
pub struct Updater<C: RemoteCatalog, T: Transport> {
    config: UpdaterConfig,
    catalog: C,
    transport: Arc<T>,
    progress: Arc<dyn ProgressSink>,
}

impl<C: RemoteCatalog, T: Transport> Updater<C, T> {
    pub fn new(config: UpdaterConfig, catalog: C, transport: T, progress: Arc<dyn ProgressSink>) -> Self {
        Self {
            config,
            catalog,
            transport: Arc::new(transport),
            progress,
        }
    }

    #[must_use]
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Computes the plan against the remote catalog without writing anything.
    pub async fn check(&self) -> Result<UpdateCheck> {
        let snapshot = self.snapshot().await?;
        let mode = self.select_mode(&snapshot);
        Ok(UpdateCheck {
            git_ref: snapshot.git_ref,
            fresh: snapshot.fresh,
            plan: snapshot.plan,
            remote: snapshot.remote,
            mode,
        })
    }

    /// Runs a full update pass under the installation lock.
    ///
    /// # Errors
    ///
    /// Lock timeouts, catalog failures and any fatal applier error
    /// (path traversal, failed transfers, archive or I/O failures).
    pub async fn update(&self) -> Result<UpdateOutcome> {
        let _lock = InstallLock::acquire(&self.config.install_dir).await?;

        let snapshot = self.snapshot().await?;
        let next = next_manifest(&snapshot.local, &snapshot.remote, &snapshot.exclusions);

        let report = if snapshot.plan.is_empty() && !snapshot.fresh {
            info!("Installation is up to date with {}", snapshot.git_ref);
            // Rewriting also drops entries whose files were deleted by hand.
            manifest::save(&self.config.install_dir, &next)?;
            None
        } else {
            let mode = self.select_mode(&snapshot);
            let applier = UpdateApplier::new(
                self.config.install_dir.clone(),
                Arc::clone(&self.transport),
                Arc::clone(&self.progress),
            )
            .with_options(self.config.apply_options())
            .with_exclusions(snapshot.exclusions.clone());

            let archive_url = self.catalog.archive_url(&snapshot.git_ref);
            Some(applier.apply(&snapshot.plan, mode, archive_url.as_deref(), &next).await?)
        };

        let preserved = report.as_ref().map(|report| report.preserved.clone()).unwrap_or_default();
        let changelog = ChangelogBuilder::new(&snapshot.plan)
            .preserved(preserved)
            .git_ref(snapshot.git_ref.clone())
            .timestamp(Local::now())
            .build();

        Ok(UpdateOutcome {
            git_ref: snapshot.git_ref,
            plan: snapshot.plan,
            report,
            changelog,
        })
    }

    fn select_mode(&self, snapshot: &Snapshot) -> ApplyMode {
        ApplyMode::select(
            &snapshot.plan,
            snapshot.fresh,
            self.config.bulk_threshold,
            self.catalog.archive_url(&snapshot.git_ref).is_some(),
        )
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        let root = &self.config.install_dir;
        let git_ref = self.config.git_ref().to_string();

        let (local, mut fresh) = match manifest::load_local(root) {
            Ok(local) => (local, false),
            Err(UpdateError::NotFound {
                ..
            }) => {
                info!("No manifest in {}, performing a fresh install", root.display());
                (Manifest::new(), true)
            }
            Err(e @ UpdateError::ParseError {
                ..
            }) => {
                warn!("{}; the manifest will be regenerated", e);
                (Manifest::new(), true)
            }
            Err(e) => return Err(e),
        };
        if self.config.full_install {
            info!("Full install requested");
            fresh = true;
        }

        let exclusions = ExclusionSet::load(&root.join(EXCLUSIONS_FILE));

        self.progress.emit(ProgressEvent::Phase(Phase::Listing));
        let entries = self.catalog.get_tree(&git_ref).await?;
        let remote = build_remote_manifest(&entries, &self.catalog, &git_ref);

        let plan = if self.config.full_install {
            // Everything is refetched; removals still come from the real local manifest.
            let mut plan = compute_plan(&Manifest::new(), &remote, &exclusions);
            plan.to_delete = compute_plan(&local, &remote, &exclusions).to_delete;
            plan
        } else {
            compute_plan(&local, &remote, &exclusions)
        };

        info!(
            "{}: {} to fetch, {} to remove (fresh: {})",
            git_ref,
            plan.to_fetch.len(),
            plan.to_delete.len(),
            fresh
        );

        Ok(Snapshot {
            git_ref,
            fresh,
            local,
            remote,
            exclusions,
            plan,
        })
    }
}
