//! Cross-platform utilities and helpers
//!
//! - [`fs`] - atomic writes, directory creation, quarantine moves
//! - [`progress`] - progress events, throttling and terminal rendering

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, ensure_dir, ensure_parent_dir};
pub use progress::{NoProgress, PercentThrottle, ProgressEvent, ProgressSink};
