use anyhow::Result;
use predicates::prelude::*;
use std::fs;

use crate::common::TestInstall;

#[test]
fn test_status_before_install() -> Result<()> {
    let install = TestInstall::new()?;

    install
        .mudsync()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No manifest found"))
        .stdout(predicate::str::is_match(r"Channel:\s+stable \(main\)")?);
    Ok(())
}

#[test]
fn test_status_counts() -> Result<()> {
    let install = TestInstall::new()?;
    install.publish("main", "a.txt", "A")?;
    install.publish("main", "b.txt", "B")?;
    install.publish("main", "gone.txt", "G")?;
    install.mudsync().arg("update").assert().success();

    install.unpublish("main", "gone.txt")?;
    install.mudsync().arg("update").assert().success();

    fs::remove_file(install.install_path().join("b.txt"))?;
    install.write_local("notes.txt", "mine")?;

    install
        .mudsync()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"Tracked:\s+2")?)
        .stdout(predicate::str::is_match(r"Missing:\s+1")?)
        .stdout(predicate::str::contains("! b.txt"))
        .stdout(predicate::str::is_match(r"Untracked:\s+1")?)
        .stdout(predicate::str::is_match(r"Quarantined:\s+1")?);
    Ok(())
}
