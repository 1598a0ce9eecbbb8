//! Global constants used throughout the mudsync codebase.
//!
//! File names that make up the on-disk layout of an installation, default
//! tuning values for the applier and transport, and the backoff parameters
//! shared by the lock and retry loops.

use std::time::Duration;

/// Name of the local manifest dotfile in the installation root.
pub const MANIFEST_FILE: &str = ".manifest";

/// Name of the optional exclusions file in the installation root.
pub const EXCLUSIONS_FILE: &str = ".exclusions";

/// Quarantine directory that receives files removed upstream.
pub const QUARANTINE_DIR: &str = ".old";

/// Directory holding updater-private state (locks).
pub const STATE_DIR: &str = ".mudsync";

/// Configuration file looked up in the installation root.
pub const CONFIG_FILE: &str = "mudsync.toml";

/// Version descriptor shipped alongside the distribution.
pub const VERSION_DESCRIPTOR_FILE: &str = "version.json";

/// Executable names the updater may be shipped under.
pub const UPDATER_EXECUTABLES: &[&str] = &["mudsync", "mudsync.exe", "update.exe"];

/// Number of files above which a differential update switches to the archive path.
pub const DEFAULT_BULK_THRESHOLD: usize = 100;

/// Maximum number of concurrent per-file transfers.
pub const DEFAULT_MAX_PARALLEL: usize = 6;

/// Per-request timeout for single file downloads (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-request timeout for archive downloads (10 minutes).
pub const DEFAULT_ARCHIVE_TIMEOUT: Duration = Duration::from_secs(600);

/// Attempts made by the transport before a transfer is reported as failed.
pub const DEFAULT_RETRY_ATTEMPTS: usize = 3;

/// Starting delay for transfer retries.
pub const RETRY_BASE_DELAY_MS: u64 = 200;

/// Cap on the delay between transfer retries.
pub const RETRY_MAX_DELAY_MS: u64 = 5_000;

/// Timeout for acquiring the installation lock (30 seconds).
pub fn default_lock_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Maximum backoff delay for lock polling (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Starting delay for lock polling backoff (10ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// User agent sent with every HTTP request.
pub const USER_AGENT: &str = concat!("mudsync/", env!("CARGO_PKG_VERSION"));
