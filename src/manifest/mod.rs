//! The installed-files manifest.
//!
//! A [`Manifest`] maps a normalized relative path to the [`FileRecord`] that
//! was last synced there: the content hash the remote reported and the URL it
//! was fetched from. Two manifests meet in every run:
//!
//! - the **local** manifest, persisted as the `.manifest` dotfile in the
//!   installation root and describing what was last successfully synced
//! - the **remote** manifest, built from a catalog snapshot for the active
//!   channel (see [`crate::catalog::build_remote_manifest`])
//!
//! The local manifest is only ever replaced wholesale: [`io::save`] writes the
//! entries whose files exist on disk, and nothing else.
//!
//! # File Format
//!
//! ```json
//! {
//!   "scripts/main.lua": {
//!     "name": "scripts/main.lua",
//!     "hash": "7c4a8d09ca3762af61e59520943dc26494f8941b",
//!     "url": "https://raw.githubusercontent.com/org/dist/main/scripts/main.lua"
//!   }
//! }
//! ```
//!
//! Lines whose trimmed content starts with `//` or `#` are stripped before
//! parsing, so the file may carry hand-written annotations. They are not
//! written back.

pub mod io;

pub use io::{load_local, parse, save};

use crate::constants::{
    CONFIG_FILE, EXCLUSIONS_FILE, MANIFEST_FILE, QUARANTINE_DIR, STATE_DIR, UPDATER_EXECUTABLES,
    VERSION_DESCRIPTOR_FILE,
};
use crate::policy::normalize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One tracked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Normalized relative path, forward slashes.
    pub name: String,
    /// Opaque content hash (git blob id or equivalent).
    pub hash: String,
    /// Where the content is fetched from.
    pub url: String,
}

impl FileRecord {
    pub fn new(name: impl AsRef<str>, hash: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: normalize(name.as_ref()),
            hash: hash.into(),
            url: url.into(),
        }
    }
}

/// Mapping from normalized path to [`FileRecord`], iterated in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, FileRecord>,
}

impl Manifest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record under its normalized name, replacing any previous one.
    pub fn insert(&mut self, record: FileRecord) -> Option<FileRecord> {
        let key = normalize(&record.name);
        let record = FileRecord {
            name: key.clone(),
            ..record
        };
        self.entries.insert(key, record)
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.entries.get(&normalize(path))
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn remove(&mut self, path: &str) -> Option<FileRecord> {
        self.entries.remove(&normalize(path))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(path, record)` pairs in sorted path order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FileRecord)> {
        self.entries.iter()
    }

    /// Iterates paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Returns a copy with every key re-normalized.
    ///
    /// A hand-edited manifest can carry keys like `Scripts\main.lua` or
    /// `./a.txt`. The key is authoritative; each record's `name` is rewritten
    /// to match it. When two keys collapse to the same path the later one in
    /// sorted order wins.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut out = Self::new();
        for (path, record) in &self.entries {
            out.insert(FileRecord {
                name: path.clone(),
                ..record.clone()
            });
        }
        out
    }

    /// Keeps only the entries for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &FileRecord) -> bool) {
        self.entries.retain(|path, record| keep(path, record));
    }
}

impl FromIterator<FileRecord> for Manifest {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        let mut manifest = Self::new();
        for record in iter {
            manifest.insert(record);
        }
        manifest
    }
}

/// Directory prefixes that are never part of a remote manifest.
const BUILTIN_EXCLUDED_DIRS: &[&str] = &[".git/", ".github/"];

/// Client preference/database files that are never distributed.
const BUILTIN_EXCLUDED_CLIENT_FILES: &[&str] = &["mushclient.ini", "mushclient_prefs.sqlite", "mushclient.db"];

/// Returns `true` for paths that never enter a remote manifest.
///
/// Covers version-control metadata, the updater's own state and executables,
/// the version descriptor, client preference files and world files. Matching
/// is case-insensitive.
///
/// # Examples
///
/// ```rust
/// use mudsync::manifest::is_builtin_excluded;
///
/// assert!(is_builtin_excluded(".git/HEAD"));
/// assert!(is_builtin_excluded("Update.exe"));
/// assert!(is_builtin_excluded("worlds/Aardwolf.MCL"));
/// assert!(!is_builtin_excluded("scripts/main.lua"));
/// ```
#[must_use]
pub fn is_builtin_excluded(path: &str) -> bool {
    let path = normalize(path).to_lowercase();

    let state_dirs = [format!("{STATE_DIR}/"), format!("{QUARANTINE_DIR}/")];
    if BUILTIN_EXCLUDED_DIRS.iter().any(|dir| path.starts_with(dir))
        || state_dirs.iter().any(|dir| path.starts_with(dir.as_str()))
    {
        return true;
    }

    let exact = [MANIFEST_FILE, EXCLUSIONS_FILE, CONFIG_FILE, VERSION_DESCRIPTOR_FILE];
    if exact.contains(&path.as_str())
        || UPDATER_EXECUTABLES.contains(&path.as_str())
        || BUILTIN_EXCLUDED_CLIENT_FILES.contains(&path.as_str())
    {
        return true;
    }

    path.starts_with("worlds/") && path.ends_with(".mcl")
}
