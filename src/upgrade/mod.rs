//! Self-update check for the updater binary.
//!
//! The distribution publishes a small JSON version descriptor next to the
//! updater build. This module reads it, decides with semver comparison
//! whether a newer build exists, and can download that build with SHA-256
//! verification. Replacing the running executable is left to the caller.
//!
//! ```text
//! descriptor URL -> VersionDescriptor -> UpdateAvailable? -> download + verify
//! ```
//!
//! A failed check is never an error: an unreachable or malformed descriptor
//! simply means "no update known" and is logged at debug level.

pub mod verification;
pub mod version_check;

pub use verification::ChecksumVerifier;
pub use version_check::{SelfUpdateChecker, UpdateAvailable, VersionDescriptor};
