//! Progress reporting for long-running update phases.
//!
//! The engine never draws anything itself. It emits [`ProgressEvent`]s into a
//! [`ProgressSink`] handed to it by the caller:
//!
//! - [`NoProgress`] discards everything (library use, tests, `--no-progress`)
//! - [`ChannelProgress`] forwards events into a tokio channel for callers that
//!   want to observe them
//! - [`TerminalProgress`] renders them with `indicatif`
//!
//! Percentage-based events go through a [`PercentThrottle`], so a sink sees at
//! most one update per percentage point however often the underlying counter
//! moves.
//!
//! # Examples
//!
//! ```rust
//! use mudsync::utils::progress::PercentThrottle;
//!
//! let throttle = PercentThrottle::new();
//! assert_eq!(throttle.update(1, 1000), Some(0));
//! assert_eq!(throttle.update(2, 1000), None);
//! assert_eq!(throttle.update(10, 1000), Some(1));
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// High-level phase of an update run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Listing the remote catalog.
    Listing,
    /// Downloading individual files.
    Downloading { total: usize },
    /// Downloading the bulk archive.
    DownloadingArchive,
    /// Extracting the bulk archive.
    Extracting { total: usize },
    /// Moving removed files into quarantine.
    Quarantining { total: usize },
}

/// Event emitted by the engine while it works.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A new phase started.
    Phase(Phase),
    /// Per-file transfers completed so far.
    Files { completed: usize, total: usize, percent: u8 },
    /// Bytes of the archive received so far.
    Archive { percent: u8 },
    /// Archive entries processed so far.
    Extracted { done: usize, total: usize, percent: u8 },
    /// The run is over; renderers should clear themselves.
    Finished,
}

/// Receiver of progress events. Implementations must be cheap and non-blocking.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Sink that forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    /// Creates the sink together with the receiving end.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
            },
            rx,
        )
    }
}

impl ProgressSink for ChannelProgress {
    fn emit(&self, event: ProgressEvent) {
        // A dropped receiver only means nobody is watching.
        let _ = self.tx.send(event);
    }
}

/// Lets through at most one value per percentage point.
#[derive(Debug, Default)]
pub struct PercentThrottle {
    last: Mutex<Option<u8>>,
}

impl PercentThrottle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Integer percentage of `done` over `total`, clamped to 100. An empty total is 100%.
    #[must_use]
    pub fn percent_of(done: u64, total: u64) -> u8 {
        if total == 0 {
            return 100;
        }
        (done.saturating_mul(100) / total).min(100) as u8
    }

    /// Returns the new percentage if it differs from the last one reported.
    pub fn update(&self, done: u64, total: u64) -> Option<u8> {
        let percent = Self::percent_of(done, total);
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *last == Some(percent) {
            return None;
        }
        *last = Some(percent);
        Some(percent)
    }
}

/// Renders progress events as a terminal progress bar.
pub struct TerminalProgress {
    bar: IndicatifBar,
}

impl TerminalProgress {
    /// Creates a renderer; `enabled = false` yields a hidden bar.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        let bar = if enabled {
            IndicatifBar::new(0)
        } else {
            IndicatifBar::hidden()
        };
        bar.set_style(default_style());
        Self {
            bar,
        }
    }
}

impl ProgressSink for TerminalProgress {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase(phase) => {
                let (prefix, len) = match phase {
                    Phase::Listing => ("Listing", 0),
                    Phase::Downloading { total } => ("Downloading", total as u64),
                    Phase::DownloadingArchive => ("Archive", 100),
                    Phase::Extracting { total } => ("Extracting", total as u64),
                    Phase::Quarantining { total } => ("Removing", total as u64),
                };
                self.bar.set_prefix(prefix);
                self.bar.set_length(len);
                self.bar.set_position(0);
            }
            ProgressEvent::Files { completed, .. } => self.bar.set_position(completed as u64),
            ProgressEvent::Archive { percent } => self.bar.set_position(u64::from(percent)),
            ProgressEvent::Extracted { done, .. } => self.bar.set_position(done as u64),
            ProgressEvent::Finished => self.bar.finish_and_clear(),
        }
    }
}

fn default_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len}")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}
