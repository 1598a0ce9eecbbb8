//! Installation-level file locking for cross-process coordination.
//!
//! Two updater processes pointed at the same installation would race on the
//! manifest and on every file they write. [`InstallLock`] serializes them with
//! an OS file lock on `<root>/.mudsync/install.lock`. The lock is released
//! when the guard is dropped.
//!
//! All blocking file operations run in `spawn_blocking` so that waiting for the
//! lock never stalls the runtime's worker threads.

use crate::constants::{MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS, STATE_DIR, default_lock_timeout};
use crate::core::{Result, UpdateError};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_retry::strategy::ExponentialBackoff;
use tracing::debug;

/// Name of the lock file inside the state directory.
pub const LOCK_FILE: &str = "install.lock";

/// Exclusive lock on one installation directory.
///
/// # Example
///
/// ```rust,no_run
/// use mudsync::lock::InstallLock;
/// use std::path::Path;
///
/// # async fn example() -> mudsync::core::Result<()> {
/// let _lock = InstallLock::acquire(Path::new("/games/mud")).await?;
/// // ... update the installation ...
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct InstallLock {
    /// Lock is held for as long as this handle is open.
    _file: Arc<File>,
    path: PathBuf,
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Installation lock released");
    }
}

impl InstallLock {
    /// Path of the lock file for an installation root.
    #[must_use]
    pub fn path_for(root: &Path) -> PathBuf {
        root.join(STATE_DIR).join(LOCK_FILE)
    }

    /// Acquires the lock, waiting up to the default timeout (30 s).
    pub async fn acquire(root: &Path) -> Result<Self> {
        Self::acquire_with_timeout(root, default_lock_timeout()).await
    }

    /// Acquires the lock, polling with backoff (10 ms doubling to 500 ms) until `timeout`.
    ///
    /// # Errors
    ///
    /// [`UpdateError::LockTimeout`] when another holder keeps the lock past
    /// `timeout`; [`UpdateError::Io`] when the lock file cannot be created.
    pub async fn acquire_with_timeout(root: &Path, timeout: Duration) -> Result<Self> {
        let path = Self::path_for(root);
        debug!(path = %path.display(), "Waiting for installation lock");

        let state_dir = root.join(STATE_DIR);
        tokio::fs::create_dir_all(&state_dir)
            .await
            .map_err(|e| UpdateError::io("Creating state directory", &state_dir, e))?;

        let open_path = path.clone();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new().create(true).write(true).truncate(false).open(&open_path)
        })
        .await
        .map_err(|e| UpdateError::io("Opening lock file", &path, std::io::Error::other(e)))?
        .map_err(|e| UpdateError::io("Opening lock file", &path, e))?;
        let file = Arc::new(file);

        let start = Instant::now();
        let backoff = ExponentialBackoff::from_millis(2)
            .factor(STARTING_BACKOFF_DELAY_MS / 2)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS));

        for delay in backoff {
            let handle = Arc::clone(&file);
            let locked = tokio::task::spawn_blocking(move || handle.try_lock_exclusive())
                .await
                .map_err(|e| UpdateError::io("Locking installation", &path, std::io::Error::other(e)))?;

            if let Ok(true) = locked {
                debug!(
                    path = %path.display(),
                    wait_ms = start.elapsed().as_millis(),
                    "Installation lock acquired"
                );
                return Ok(Self {
                    _file: file,
                    path,
                });
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(delay.min(remaining)).await;
        }

        Err(UpdateError::LockTimeout {
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn test_acquire_creates_state_dir() {
        let temp = TempDir::new().unwrap();
        let lock = InstallLock::acquire(temp.path()).await.unwrap();
        assert!(InstallLock::path_for(temp.path()).exists());
        drop(lock);
    }

    #[tokio::test]
    async fn test_second_holder_times_out() {
        let temp = TempDir::new().unwrap();
        let _held = InstallLock::acquire(temp.path()).await.unwrap();

        let start = Instant::now();
        let err = InstallLock::acquire_with_timeout(temp.path(), Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, UpdateError::LockTimeout { .. }));
        assert!(start.elapsed() < Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_waiter_gets_lock_after_release() {
        let temp = TempDir::new().unwrap();
        let root = Arc::new(temp.path().to_path_buf());
        let barrier = Arc::new(Barrier::new(2));

        let holder_root = root.clone();
        let holder_barrier = barrier.clone();
        let holder = tokio::spawn(async move {
            let _lock = InstallLock::acquire(&holder_root).await.unwrap();
            holder_barrier.wait().await;
            tokio::time::sleep(Duration::from_millis(100)).await;
        });

        barrier.wait().await;
        let start = Instant::now();
        let _lock = InstallLock::acquire(&root).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));

        holder.await.unwrap();
    }
}
