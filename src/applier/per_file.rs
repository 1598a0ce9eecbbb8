//! Per-file mode: bounded concurrent downloads.

use super::Transferred;
use crate::core::{Result, UpdateError};
use crate::manifest::FileRecord;
use crate::policy::is_user_config;
use crate::transport::Transport;
use crate::utils::progress::{PercentThrottle, Phase, ProgressEvent, ProgressSink};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::debug;

/// Shared between transfer tasks; the only mutable state of a pass.
#[derive(Default)]
struct TransferState {
    completed: usize,
    fetched: Vec<String>,
    errors: Vec<(String, UpdateError)>,
}

pub(super) async fn run<T: Transport>(
    transport: Arc<T>,
    targets: Vec<(FileRecord, PathBuf)>,
    max_parallel: usize,
    progress: Arc<dyn ProgressSink>,
) -> Result<Transferred> {
    let mut preserved = Vec::new();
    let mut downloads = Vec::with_capacity(targets.len());
    for (record, target) in targets {
        // Absent user config is installed so a fresh client starts with defaults; bulk extraction does the same.
        if is_user_config(&record.name) && target.exists() {
            debug!("Keeping user configuration {}", record.name);
            preserved.push(record.name);
        } else {
            downloads.push((record, target));
        }
    }

    let total = downloads.len();
    progress.emit(ProgressEvent::Phase(Phase::Downloading {
        total,
    }));

    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
    let state = Arc::new(Mutex::new(TransferState::default()));
    let throttle = Arc::new(PercentThrottle::new());

    let handles: Vec<_> = downloads
        .into_iter()
        .map(|(record, target)| {
            let semaphore = Arc::clone(&semaphore);
            let transport = Arc::clone(&transport);
            let state = Arc::clone(&state);
            let throttle = Arc::clone(&throttle);
            let progress = Arc::clone(&progress);

            tokio::spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => fetch_one(transport.as_ref(), &record, &target).await,
                    Err(e) => Err(UpdateError::TransferFailure {
                        url: record.url.clone(),
                        reason: e.to_string(),
                    }),
                };

                let mut state = state.lock().await;
                state.completed += 1;
                match result {
                    Ok(()) => {
                        debug!("Fetched {}", record.name);
                        state.fetched.push(record.name);
                    }
                    Err(e) => {
                        debug!("Failed to fetch {}: {}", record.name, e);
                        state.errors.push((record.name, e));
                    }
                }
                if let Some(percent) = throttle.update(state.completed as u64, total as u64) {
                    progress.emit(ProgressEvent::Files {
                        completed: state.completed,
                        total,
                        percent,
                    });
                }
            })
        })
        .collect();

    let joined = join_all(handles).await;

    let mut state = state.lock().await;
    for join_result in joined {
        if let Err(e) = join_result {
            state.errors.push((
                String::new(),
                UpdateError::TransferFailure {
                    url: String::new(),
                    reason: format!("transfer task failed: {e}"),
                },
            ));
        }
    }

    if !state.errors.is_empty() {
        let failed = state.errors.len();
        state.errors.sort_by(|a, b| a.0.cmp(&b.0));
        let (_, sample) = state.errors.swap_remove(0);
        return Err(UpdateError::AggregateFailure {
            failed,
            total,
            sample: Box::new(sample),
        });
    }

    let mut fetched = std::mem::take(&mut state.fetched);
    fetched.sort();
    preserved.sort();
    Ok(Transferred {
        fetched,
        preserved,
    })
}

async fn fetch_one<T: Transport>(transport: &T, record: &FileRecord, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| UpdateError::io("Creating directory", parent, e))?;
    }
    transport.fetch(&record.url, target).await
}
