//! User-supplied exclusion patterns.
//!
//! The `.exclusions` file lists paths the user does not want the updater to
//! fetch: one pattern per line, blank lines and `#` comments ignored. Three
//! pattern forms are recognised:
//!
//! - exact path: `sounds/beep.wav`
//! - directory prefix (trailing slash): `sounds/`
//! - glob (contains `*`): `sounds/*.wav`, `**/*.ogg`
//!
//! Patterns and candidate paths are normalized and lower-cased before
//! comparison, so matching is case-insensitive.

use super::normalize;
use glob::Pattern;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

/// A set of exclusion patterns.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    exact: BTreeSet<String>,
    prefixes: Vec<String>,
    globs: Vec<Pattern>,
}

impl ExclusionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from an iterator of raw patterns.
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for pattern in patterns {
            set.insert(pattern.as_ref());
        }
        set
    }

    /// Parses the contents of an exclusions file.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        Self::from_patterns(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// Loads an exclusions file. A missing or unreadable file yields an empty set.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let set = Self::parse(&content);
                debug!("Loaded {} exclusion patterns from {}", set.len(), path.display());
                set
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::new(),
            Err(e) => {
                warn!("Ignoring unreadable exclusions file {}: {}", path.display(), e);
                Self::new()
            }
        }
    }

    /// Adds one pattern to the set.
    pub fn insert(&mut self, raw: &str) {
        let raw = raw.trim();
        let is_dir = raw.ends_with('/') || raw.ends_with('\\');
        let normalized = normalize(raw).to_lowercase();
        if normalized.is_empty() {
            return;
        }

        if is_dir {
            self.prefixes.push(format!("{normalized}/"));
        } else if normalized.contains('*') {
            match Pattern::new(&normalized) {
                Ok(pattern) => self.globs.push(pattern),
                Err(e) => {
                    warn!("Invalid exclusion glob '{}': {}; matching it literally", raw, e);
                    self.exact.insert(normalized);
                }
            }
        } else {
            self.exact.insert(normalized);
        }
    }

    /// Returns `true` if `path` is excluded.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        let path = normalize(path).to_lowercase();

        self.exact.contains(&path)
            || self.globs.iter().any(|pattern| pattern.matches(&path))
            || self.prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Number of patterns in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.exact.len() + self.prefixes.len() + self.globs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let set = ExclusionSet::from_patterns(["Sounds/Beep.wav"]);
        assert!(set.matches("sounds/beep.wav"));
        assert!(set.matches("SOUNDS\\BEEP.WAV"));
        assert!(!set.matches("sounds/beep2.wav"));
    }

    #[test]
    fn test_directory_prefix() {
        let set = ExclusionSet::from_patterns(["sounds/"]);
        assert!(set.matches("sounds/a.wav"));
        assert!(set.matches("Sounds/deep/b.wav"));
        assert!(!set.matches("soundscape.txt"));
    }

    #[test]
    fn test_glob_patterns() {
        let set = ExclusionSet::from_patterns(["*.ogg", "scripts/*.bak"]);
        assert!(set.matches("music.ogg"));
        assert!(set.matches("music/battle/theme.OGG"));
        assert!(set.matches("scripts/old.bak"));
        assert!(!set.matches("scripts/old.lua"));
    }

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let set = ExclusionSet::parse("# my exclusions\n\n  sounds/  \n#logs/\nreadme.txt\n");
        assert_eq!(set.len(), 2);
        assert!(set.matches("sounds/x.wav"));
        assert!(set.matches("readme.txt"));
        assert!(!set.matches("logs/a.txt"));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let set = ExclusionSet::load(&temp.path().join(".exclusions"));
        assert!(set.is_empty());
        assert!(!set.matches("anything"));
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join(".exclusions");
        std::fs::write(&file, "fonts/\n*.chm\n").unwrap();
        let set = ExclusionSet::load(&file);
        assert!(set.matches("fonts/dejavu.ttf"));
        assert!(set.matches("help/manual.chm"));
    }
}
