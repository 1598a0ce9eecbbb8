use anyhow::Result;
use predicates::prelude::*;
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::fs;

use crate::common::TestInstall;

fn descriptor_config(install: &TestInstall, version: &str) -> Result<()> {
    let descriptor = install.install_path().join("version.json");
    fs::write(
        &descriptor,
        format!(
            r#"{{"version": "{version}", "url": "https://example.com/mudsync", "sha256": "00", "notes": "Faster installs"}}"#
        ),
    )?;
    let url = Url::from_file_path(&descriptor).map_err(|()| anyhow::anyhow!("bad descriptor path"))?;
    install.write_config(&format!("[self_update]\ndescriptor_url = \"{url}\"\n"))
}

#[test]
fn test_newer_build_is_reported() -> Result<()> {
    let install = TestInstall::new()?;
    descriptor_config(&install, "999.0.0")?;

    install
        .mudsync()
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("update available"))
        .stdout(predicate::str::contains("999.0.0"))
        .stdout(predicate::str::contains("Faster installs"));
    Ok(())
}

#[test]
fn test_older_build_is_up_to_date() -> Result<()> {
    let install = TestInstall::new()?;
    descriptor_config(&install, "0.0.1")?;

    install
        .mudsync()
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("is up to date"));
    Ok(())
}

#[test]
fn test_without_descriptor() -> Result<()> {
    let install = TestInstall::new()?;

    install
        .mudsync()
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("No version descriptor configured"));
    Ok(())
}

fn published_build(install: &TestInstall, body: &[u8], sha256: &str) -> Result<()> {
    let build = install.install_path().join("mudsync-999.bin");
    fs::write(&build, body)?;
    let build_url = Url::from_file_path(&build).map_err(|()| anyhow::anyhow!("bad build path"))?;

    let descriptor = install.install_path().join("version.json");
    fs::write(&descriptor, format!(r#"{{"version": "999.0.0", "url": "{build_url}", "sha256": "{sha256}"}}"#))?;
    let url = Url::from_file_path(&descriptor).map_err(|()| anyhow::anyhow!("bad descriptor path"))?;
    install.write_config(&format!("[self_update]\ndescriptor_url = \"{url}\"\n"))
}

#[test]
fn test_download_saves_verified_build() -> Result<()> {
    let install = TestInstall::new()?;
    let body = b"updater build";
    published_build(&install, body, &hex::encode(Sha256::digest(body)))?;
    let dest = install.install_path().join("mudsync.new");

    install
        .mudsync()
        .arg("self-check")
        .arg("--download")
        .arg(&dest)
        .assert()
        .success()
        .stdout(predicate::str::contains("Verified build saved to"));

    assert_eq!(fs::read(&dest)?, body);
    Ok(())
}

#[test]
fn test_download_with_wrong_checksum_fails() -> Result<()> {
    let install = TestInstall::new()?;
    published_build(&install, b"tampered build", &"0".repeat(64))?;
    let dest = install.install_path().join("mudsync.new");

    install
        .mudsync()
        .arg("self-check")
        .arg("--download")
        .arg(&dest)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to download updater"));

    assert!(!dest.exists());
    Ok(())
}
