//! Test utilities for mudsync
//!
//! Helpers shared by unit tests and the integration suite (enabled through the
//! `test-utils` feature):
//! - logging initialisation that plays well with the test harness
//! - fixtures for installation trees and zip archives
//! - an in-memory [`ScriptedTransport`] and [`StaticCatalog`] so the applier
//!   and the updater session can be exercised without a network
//!
//! # Example
//!
//! ```rust,no_run
//! use mudsync::test_utils::{ScriptedTransport, build_zip};
//!
//! let transport = ScriptedTransport::new();
//! transport.serve("mock://files/a.txt", "hello");
//! transport.serve("mock://archive/main", build_zip(&[("dist-main/a.txt", b"hello".as_slice())]));
//! ```

pub mod fixtures;
pub mod mocks;

pub use fixtures::{build_zip, read_tree, write_tree};
pub use mocks::{ScriptedTransport, StaticCatalog, serve_json};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `level = None` the subscriber is
/// installed only when `RUST_LOG` is set:
///
/// ```bash
/// RUST_LOG=mudsync=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
