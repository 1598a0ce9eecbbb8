//! Integration test suite for mudsync
//!
//! Drives the built binary against a local mirror directory, so no network
//! access is needed.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **update**: fresh installs, differential updates, quarantine, user data
//! - **check**: dry runs
//! - **status**: installation summaries
//! - **channel**: switching between stable and dev
//! - **self_check**: updater version check
//! - **error_scenarios**: configuration and source failures

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod channel;
mod check;
mod error_scenarios;
mod self_check;
mod status;
mod update;
