//! Error handling for mudsync
//!
//! Two layers, the same way the rest of the crate is split:
//! - [`UpdateError`] is the typed error returned by the engine (path policy,
//!   manifest store, diff, transport, applier). Callers match on it to decide
//!   whether a failure is recoverable (`NotFound`), regenerable
//!   (`ParseError`) or fatal (`PathTraversal`).
//! - [`ErrorContext`] wraps any error that reaches the command line with a
//!   short explanation and an actionable suggestion.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mudsync::core::{UpdateError, user_friendly_error};
//!
//! let err = UpdateError::PathTraversal { path: "../../etc/passwd".into() };
//! let ctx = user_friendly_error(anyhow::Error::from(err));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for update operations.
///
/// # Error Categories
///
/// - [`NotFound`](UpdateError::NotFound) - expected absence, recovered by callers
/// - [`ParseError`](UpdateError::ParseError) - malformed persisted state
/// - [`PathTraversal`](UpdateError::PathTraversal) - a target escapes the installation root
/// - [`TransferFailure`](UpdateError::TransferFailure) - one download failed after retries
/// - [`AggregateFailure`](UpdateError::AggregateFailure) - one or more per-file transfers failed
#[derive(Error, Debug)]
pub enum UpdateError {
    /// A file the engine looked for does not exist.
    #[error("{what} not found: {}", path.display())]
    NotFound {
        what: &'static str,
        path: PathBuf,
    },

    /// Persisted state could not be decoded.
    #[error("Failed to parse {}: {reason}", file.display())]
    ParseError {
        file: PathBuf,
        reason: String,
    },

    /// A resolved target lies outside the installation root.
    #[error("Refusing to write outside the installation root: {path}")]
    PathTraversal {
        path: String,
    },

    /// A single download failed after the transport exhausted its retries.
    #[error("Failed to download {url}: {reason}")]
    TransferFailure {
        url: String,
        reason: String,
    },

    /// One or more per-file transfers failed in a single pass.
    #[error("{failed} of {total} downloads failed; first error: {sample}")]
    AggregateFailure {
        failed: usize,
        total: usize,
        sample: Box<UpdateError>,
    },

    /// A downloaded file did not match its expected digest.
    #[error("Checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// The remote catalog could not be listed.
    #[error("Failed to list remote catalog at {git_ref}: {reason}")]
    Catalog {
        git_ref: String,
        reason: String,
    },

    /// Configuration was invalid.
    #[error("Configuration error: {message}")]
    Config {
        message: String,
    },

    /// Another updater instance holds the installation lock.
    #[error("Timed out waiting for the installation lock at {}", path.display())]
    LockTimeout {
        path: PathBuf,
    },

    /// Filesystem failure with the operation and path that caused it.
    #[error("{operation} failed for {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An archive could not be read.
    #[error("Invalid archive {}: {reason}", path.display())]
    Archive {
        path: PathBuf,
        reason: String,
    },
}

impl UpdateError {
    /// Shorthand for wrapping an [`std::io::Error`] with its operation and path.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Whether this error is the recoverable "nothing there yet" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias used by the engine modules.
pub type Result<T, E = UpdateError> = std::result::Result<T, E>;

/// Error wrapper with a user-facing suggestion and details.
#[derive(Debug)]
pub struct ErrorContext {
    /// Rendered message of the underlying error chain.
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: message in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert any error reaching the CLI into an [`ErrorContext`] with a suggestion.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let message = format!("{error:#}");

    if let Some(update_error) = error.chain().find_map(|e| e.downcast_ref::<UpdateError>()) {
        return match update_error {
            UpdateError::PathTraversal { .. } => ErrorContext::new(message)
                .with_details(
                    "The remote catalog listed a path that resolves outside the installation directory",
                )
                .with_suggestion(
                    "Nothing was written. Check the configured source; the catalog may be corrupted or tampered with",
                ),
            UpdateError::ParseError { .. } => ErrorContext::new(message)
                .with_suggestion("Run `mudsync update --full` to regenerate the manifest from scratch"),
            UpdateError::AggregateFailure { .. } | UpdateError::TransferFailure { .. } => {
                ErrorContext::new(message)
                    .with_details("Files that downloaded successfully were kept")
                    .with_suggestion("Check your network connection and run `mudsync update` again")
            }
            UpdateError::Catalog { .. } => ErrorContext::new(message).with_suggestion(
                "Check the [source] section of mudsync.toml and that the channel's ref exists",
            ),
            UpdateError::LockTimeout { .. } => ErrorContext::new(message).with_suggestion(
                "Another mudsync process is updating this installation; wait for it to finish",
            ),
            UpdateError::ChecksumMismatch { .. } => ErrorContext::new(message)
                .with_details("The downloaded file was deleted")
                .with_suggestion("Retry the download; if it persists the release may be corrupted"),
            UpdateError::Config { .. } => ErrorContext::new(message)
                .with_suggestion("Check the syntax and values in mudsync.toml"),
            _ => ErrorContext::new(message),
        };
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(message).with_suggestion(
            "Check that the installation directory is writable by the current user",
        );
    }

    if error.downcast_ref::<toml::de::Error>().is_some() {
        return ErrorContext::new(message)
            .with_suggestion("Check the TOML syntax in mudsync.toml. Verify quotes and brackets");
    }

    ErrorContext::new(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_failure_reports_count_and_sample() {
        let err = UpdateError::AggregateFailure {
            failed: 2,
            total: 5,
            sample: Box::new(UpdateError::TransferFailure {
                url: "https://example.com/a.txt".to_string(),
                reason: "HTTP 404".to_string(),
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("2 of 5"));
        assert!(msg.contains("HTTP 404"));
    }

    #[test]
    fn test_user_friendly_path_traversal() {
        let err = UpdateError::PathTraversal {
            path: "../evil".to_string(),
        };
        let ctx = user_friendly_error(anyhow::Error::from(err));
        assert!(ctx.message.contains("../evil"));
        assert!(ctx.suggestion.is_some());
        assert!(ctx.details.is_some());
    }

    #[test]
    fn test_user_friendly_finds_error_through_context() {
        use anyhow::Context;

        let result: std::result::Result<(), UpdateError> = Err(UpdateError::LockTimeout {
            path: PathBuf::from("/tmp/x.lock"),
        });
        let err = result.context("Failed to start update").unwrap_err();
        let ctx = user_friendly_error(err);
        assert!(ctx.message.contains("Failed to start update"));
        assert!(ctx.suggestion.unwrap().contains("Another mudsync process"));
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new("boom").with_details("why").with_suggestion("fix it");
        assert_eq!(ctx.to_string(), "boom\nDetails: why\nSuggestion: fix it");
    }

    #[test]
    fn test_is_not_found() {
        let err = UpdateError::NotFound {
            what: "Manifest",
            path: PathBuf::from(".manifest"),
        };
        assert!(err.is_not_found());
        assert!(!UpdateError::Config { message: "x".into() }.is_not_found());
    }
}
