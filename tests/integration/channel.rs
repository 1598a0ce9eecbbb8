use anyhow::Result;
use predicates::prelude::*;

use crate::common::{FileAssert, TestInstall};

#[test]
fn test_switch_channel_and_update() -> Result<()> {
    let install = TestInstall::new()?;
    install.publish("main", "common.txt", "stable")?;
    install.publish("dev", "common.txt", "dev")?;
    install.publish("dev", "experimental.lua", "new")?;
    install.mudsync().arg("update").assert().success();

    install
        .mudsync()
        .args(["channel", "dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stable -> dev"))
        .stdout(predicate::str::contains("+ experimental.lua"))
        .stdout(predicate::str::contains("* common.txt"));

    assert!(install.read_local("mudsync.toml").contains("channel = \"dev\""));
    assert_eq!(install.read_local("common.txt"), "dev");

    install
        .mudsync()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"Channel:\s+dev \(dev\)")?);
    Ok(())
}

#[test]
fn test_channel_without_update() -> Result<()> {
    let install = TestInstall::new()?;
    install.publish("dev", "experimental.lua", "new")?;

    install.mudsync().args(["channel", "dev", "--no-update"]).assert().success();

    assert!(install.read_local("mudsync.toml").contains("channel = \"dev\""));
    assert!(install.read_local("mudsync.toml").contains("kind = \"local\""));
    FileAssert::not_exists(install.install_path().join("experimental.lua"));
    Ok(())
}

#[test]
fn test_unknown_channel_is_rejected() -> Result<()> {
    let install = TestInstall::new()?;
    install.mudsync().args(["channel", "beta"]).assert().failure().code(2);
    Ok(())
}
