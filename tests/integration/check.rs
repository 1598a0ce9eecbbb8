use anyhow::Result;
use predicates::prelude::*;

use crate::common::{FileAssert, TestInstall};

#[test]
fn test_check_reports_without_writing() -> Result<()> {
    let install = TestInstall::new()?;
    install.publish("main", "x", "X1")?;
    install.publish("main", "y/z.lua", "Z1")?;

    install
        .mudsync()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fresh install"))
        .stdout(predicate::str::contains("+ y/z.lua"))
        .stdout(predicate::str::contains("mudsync update"));

    FileAssert::not_exists(install.install_path().join("x"));
    FileAssert::not_exists(install.install_path().join(".manifest"));
    FileAssert::not_exists(install.install_path().join(".mudsync"));
    Ok(())
}

#[test]
fn test_check_after_update() -> Result<()> {
    let install = TestInstall::new()?;
    install.publish("main", "x", "X1")?;
    install.mudsync().arg("update").assert().success();

    install
        .mudsync()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Already up to date"));

    install.publish("main", "x", "X2")?;
    install
        .mudsync()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("* x"));
    FileAssert::equals(install.install_path().join("x"), "X1");
    Ok(())
}

#[test]
fn test_check_other_channel() -> Result<()> {
    let install = TestInstall::new()?;
    install.publish("dev", "dev.txt", "D")?;

    install
        .mudsync()
        .args(["check", "--channel", "dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("+ dev.txt"));
    Ok(())
}
