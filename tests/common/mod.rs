//! Common test utilities for mudsync integration tests
//!
//! Every test gets a scratch directory holding an installation directory and
//! a local mirror with one subdirectory per ref (`main`, `dev`). The
//! installation's `mudsync.toml` points at the mirror.

// Not every helper is used by every test module.
#![allow(dead_code)]

use anyhow::{Context, Result};
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Installation directory plus a mirror to update from.
pub struct TestInstall {
    _temp_dir: TempDir, // Keep alive for RAII cleanup
    install_dir: PathBuf,
    mirror_dir: PathBuf,
}

impl TestInstall {
    /// Creates empty install and mirror directories and a config using the mirror.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let install_dir = temp_dir.path().join("install");
        let mirror_dir = temp_dir.path().join("mirror");
        fs::create_dir_all(&install_dir)?;
        fs::create_dir_all(mirror_dir.join("main"))?;
        fs::create_dir_all(mirror_dir.join("dev"))?;

        let install = Self {
            _temp_dir: temp_dir,
            install_dir,
            mirror_dir,
        };
        install.write_config("")?;
        Ok(install)
    }

    pub fn install_path(&self) -> &Path {
        &self.install_dir
    }

    pub fn mirror_path(&self) -> &Path {
        &self.mirror_dir
    }

    /// Writes `mudsync.toml` with a local source plus `extra` top-level keys.
    pub fn write_config(&self, extra: &str) -> Result<()> {
        let mirror = self.mirror_dir.display().to_string().replace('\\', "/");
        let content = format!("{extra}\n[source]\nkind = \"local\"\npath = \"{mirror}\"\n");
        fs::write(self.install_dir.join("mudsync.toml"), content).context("Failed to write mudsync.toml")
    }

    /// Writes a file into the mirror for `git_ref`.
    pub fn publish(&self, git_ref: &str, path: &str, content: &str) -> Result<()> {
        write_file(&self.mirror_dir.join(git_ref), path, content)
    }

    /// Removes a file from the mirror for `git_ref`.
    pub fn unpublish(&self, git_ref: &str, path: &str) -> Result<()> {
        fs::remove_file(self.mirror_dir.join(git_ref).join(path))
            .with_context(|| format!("Failed to remove {path} from the mirror"))
    }

    /// Writes a file into the installation directory.
    pub fn write_local(&self, path: &str, content: &str) -> Result<()> {
        write_file(&self.install_dir, path, content)
    }

    pub fn read_local(&self, path: &str) -> String {
        let target = self.install_dir.join(path);
        fs::read_to_string(&target).unwrap_or_else(|e| panic!("Failed to read {}: {}", target.display(), e))
    }

    /// `mudsync --dir <install> --no-progress <args>`.
    pub fn mudsync(&self) -> Command {
        let mut cmd = Command::cargo_bin("mudsync").expect("mudsync binary is built");
        cmd.arg("--dir").arg(&self.install_dir).arg("--no-progress").env("NO_COLOR", "1").env_remove("RUST_LOG");
        cmd
    }
}

fn write_file(root: &Path, path: &str, content: &str) -> Result<()> {
    let target = root.join(path);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, content).with_context(|| format!("Failed to write {}", target.display()))
}

/// File assertion helpers
pub struct FileAssert;

impl FileAssert {
    /// Assert a file exists
    pub fn exists(path: impl AsRef<Path>) {
        let path = path.as_ref();
        assert!(path.exists(), "Expected file to exist: {}", path.display());
    }

    /// Assert a file does not exist
    pub fn not_exists(path: impl AsRef<Path>) {
        let path = path.as_ref();
        assert!(!path.exists(), "Expected file to not exist: {}", path.display());
    }

    /// Assert a file has exact content
    pub fn equals(path: impl AsRef<Path>, expected: &str) {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read file {}: {}", path.display(), e));
        assert_eq!(content, expected, "File {} content mismatch", path.display());
    }
}
