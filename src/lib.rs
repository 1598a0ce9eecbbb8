//! mudsync - a manifest-driven updater for MUD client distributions
//!
//! mudsync keeps a local installation directory in step with a published
//! distribution (a version-controlled repository or a mirror directory). It
//! compares a local manifest of installed files with the remote listing,
//! downloads what changed, moves files that disappeared upstream into a
//! `.old/` quarantine, and records the new state.
//!
//! # Architecture Overview
//!
//! ```text
//! RemoteCatalog + local manifest -> compute_plan -> UpdatePlan
//!     -> UpdateApplier (files, .old/, .manifest) -> Changelog
//! ```
//!
//! ## Key Features
//!
//! - **Hash-driven diffs**: only files whose content hash changed are fetched
//! - **Two apply modes**: bounded-parallel per-file downloads, or one archive
//!   for fresh installs and large deltas
//! - **User data is safe**: client preferences, worlds and logs are never overwritten
//! - **Path traversal protection**: every target is checked before anything is written
//! - **Channels**: `stable` and `dev` map to repository refs
//!
//! # Core Modules
//!
//! ## Engine
//! - [`policy`] - Path normalization, case resolution, user-config and exclusion rules
//! - [`manifest`] - The `.manifest` record of installed files
//! - [`diff`] - Plan computation
//! - [`applier`] - Applying a plan to disk
//! - [`changelog`] - Human-readable summaries
//!
//! ## Remote Access
//! - [`catalog`] - Remote listings (GitHub tree API, local mirror)
//! - [`transport`] - HTTP and `file://` downloads with retry
//!
//! ## Orchestration
//! - [`updater`] - Check and update sessions
//! - [`lock`] - Cross-process installation lock
//! - [`config`] - `mudsync.toml`
//! - [`upgrade`] - Self-update check for the updater binary
//! - [`cli`] - Command-line front end
//!
//! ## Supporting
//! - [`core`] - Error types and user-facing error rendering
//! - [`constants`] - File names and tuning defaults
//! - [`utils`] - Filesystem helpers and progress reporting

pub mod applier;
pub mod catalog;
pub mod changelog;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod diff;
pub mod lock;
pub mod manifest;
pub mod policy;
pub mod transport;
pub mod updater;
pub mod upgrade;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
