//! Core types shared by every layer of the updater.
//!
//! Currently this is the error taxonomy: [`UpdateError`] for the engine and
//! [`ErrorContext`] / [`user_friendly_error`] for presenting failures on the
//! command line.

pub mod error;

pub use error::{ErrorContext, Result, UpdateError, user_friendly_error};
