//! Downloading file content.
//!
//! The applier never talks HTTP directly; it goes through a [`Transport`].
//! Every transfer writes the full body to the destination, replacing
//! whatever was there. Partial downloads are never resumed. Retrying is the
//! transport's job: by the time an error reaches the applier, the transport
//! has already given up.

pub mod http;

pub use http::{HttpTransport, TransportOptions};

use crate::core::Result;
use crate::utils::progress::ProgressSink;
use std::future::Future;
use std::path::Path;

/// Moves bytes from a URL to a local file.
pub trait Transport: Send + Sync + 'static {
    /// Downloads `url` into `dest`, overwriting it.
    fn fetch(&self, url: &str, dest: &Path) -> impl Future<Output = Result<()>> + Send;

    /// Downloads an archive into `dest`, reporting percentage progress to `progress`.
    fn fetch_archive(
        &self,
        url: &str,
        dest: &Path,
        progress: &dyn ProgressSink,
    ) -> impl Future<Output = Result<()>> + Send;
}
