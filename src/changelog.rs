//! Human-readable summary of a plan or of an applied update.
//!
//! Each path gets a one-character marker:
//!
//! | Marker | Meaning                                   |
//! |--------|-------------------------------------------|
//! | `+`    | new file                                  |
//! | `*`    | changed file                              |
//! | `-`    | removed upstream (moved to `.old/`)       |
//! | `=`    | user configuration kept as it was on disk |
//!
//! ```rust
//! use mudsync::changelog::ChangelogBuilder;
//! use mudsync::diff::UpdatePlan;
//!
//! let changelog = ChangelogBuilder::new(&UpdatePlan::default()).build();
//! assert_eq!(changelog.to_string(), "Already up to date\n");
//! ```

use crate::diff::UpdatePlan;
use chrono::{DateTime, Local};
use colored::Colorize;
use std::collections::BTreeSet;
use std::fmt;

/// What happened to one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangeKind {
    Added,
    Changed,
    Removed,
    Preserved,
}

impl ChangeKind {
    #[must_use]
    pub fn marker(self) -> char {
        match self {
            Self::Added => '+',
            Self::Changed => '*',
            Self::Removed => '-',
            Self::Preserved => '=',
        }
    }
}

/// A rendered summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changelog {
    /// Header with the counts, or "Already up to date".
    pub header: String,
    /// One entry per path, grouped by kind.
    pub entries: Vec<(ChangeKind, String)>,
}

impl Changelog {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.entries.iter().filter(|(k, _)| *k == kind).count()
    }

    /// Same text as [`Display`](fmt::Display), with colored markers.
    #[must_use]
    pub fn render_colored(&self) -> String {
        let mut out = format!("{}\n", self.header.bold());
        for (kind, path) in &self.entries {
            let marker = kind.marker().to_string();
            let marker = match kind {
                ChangeKind::Added => marker.green(),
                ChangeKind::Changed => marker.yellow(),
                ChangeKind::Removed => marker.red(),
                ChangeKind::Preserved => marker.cyan(),
            };
            out.push_str(&format!("  {marker} {path}\n"));
        }
        out
    }
}

impl fmt::Display for Changelog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header)?;
        for (kind, path) in &self.entries {
            writeln!(f, "  {} {}", kind.marker(), path)?;
        }
        Ok(())
    }
}

/// Builds a [`Changelog`] from a plan and the user-config paths the applier kept.
pub struct ChangelogBuilder<'a> {
    plan: &'a UpdatePlan,
    preserved: BTreeSet<String>,
    git_ref: Option<String>,
    timestamp: Option<DateTime<Local>>,
}

impl<'a> ChangelogBuilder<'a> {
    #[must_use]
    pub fn new(plan: &'a UpdatePlan) -> Self {
        Self {
            plan,
            preserved: BTreeSet::new(),
            git_ref: None,
            timestamp: None,
        }
    }

    /// Paths that were planned for fetch but kept because they are user configuration.
    #[must_use]
    pub fn preserved<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preserved.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Ref the update targeted, shown in the header.
    #[must_use]
    pub fn git_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = Some(git_ref.into());
        self
    }

    /// Time shown in the header.
    #[must_use]
    pub fn timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn build(self) -> Changelog {
        let mut entries = Vec::new();

        for record in &self.plan.to_fetch {
            if self.preserved.contains(&record.name) {
                continue;
            }
            let kind = if self.plan.is_new(&record.name) {
                ChangeKind::Added
            } else {
                ChangeKind::Changed
            };
            entries.push((kind, record.name.clone()));
        }
        entries.extend(self.plan.to_delete.iter().map(|path| (ChangeKind::Removed, path.clone())));
        entries.extend(self.preserved.iter().map(|path| (ChangeKind::Preserved, path.clone())));
        entries.sort();

        if entries.is_empty() {
            return Changelog {
                header: "Already up to date".to_string(),
                entries,
            };
        }

        let count = |kind: ChangeKind| entries.iter().filter(|(k, _)| *k == kind).count();
        let mut header = String::from("Update");
        if let Some(git_ref) = &self.git_ref {
            header.push_str(&format!(" from {git_ref}"));
        }
        if let Some(timestamp) = &self.timestamp {
            header.push_str(&format!(" at {}", timestamp.format("%Y-%m-%d %H:%M")));
        }
        header.push_str(&format!(
            ": {} added, {} changed, {} removed, {} preserved",
            count(ChangeKind::Added),
            count(ChangeKind::Changed),
            count(ChangeKind::Removed),
            count(ChangeKind::Preserved)
        ));

        Changelog {
            header,
            entries,
        }
    }
}
