use anyhow::Result;
use predicates::prelude::*;
use std::fs;

use crate::common::TestInstall;

#[test]
fn test_invalid_config_fails() -> Result<()> {
    let install = TestInstall::new()?;
    fs::write(install.install_path().join("mudsync.toml"), "channel = [unclosed")?;

    install
        .mudsync()
        .arg("status")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("mudsync.toml"));
    Ok(())
}

#[test]
fn test_missing_mirror_fails_with_suggestion() -> Result<()> {
    let install = TestInstall::new()?;
    fs::remove_dir_all(install.mirror_path())?;

    install
        .mudsync()
        .arg("update")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("does not exist"))
        .stderr(predicate::str::contains("suggestion"));
    Ok(())
}

#[test]
fn test_corrupt_manifest_is_regenerated() -> Result<()> {
    let install = TestInstall::new()?;
    install.publish("main", "x", "X1")?;
    install.write_local(".manifest", "// header\n{ not json")?;

    install.mudsync().arg("update").assert().success();

    let manifest = install.read_local(".manifest");
    assert!(manifest.contains("\"x\""));
    Ok(())
}
