use anyhow::Result;
use predicates::prelude::*;

use crate::common::{FileAssert, TestInstall};

#[test]
fn test_fresh_install_from_mirror() -> Result<()> {
    let install = TestInstall::new()?;
    install.publish("main", "x", "X1")?;
    install.publish("main", "y/z.lua", "Z1")?;

    install
        .mudsync()
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 added"))
        .stdout(predicate::str::contains("+ x"))
        .stdout(predicate::str::contains("+ y/z.lua"));

    FileAssert::equals(install.install_path().join("x"), "X1");
    FileAssert::equals(install.install_path().join("y/z.lua"), "Z1");
    FileAssert::exists(install.install_path().join(".manifest"));
    Ok(())
}

#[test]
fn test_second_run_is_up_to_date() -> Result<()> {
    let install = TestInstall::new()?;
    install.publish("main", "x", "X1")?;

    install.mudsync().arg("update").assert().success();
    install
        .mudsync()
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("Already up to date"));
    Ok(())
}

#[test]
fn test_changed_and_removed_files() -> Result<()> {
    let install = TestInstall::new()?;
    install.publish("main", "keep.txt", "same")?;
    install.publish("main", "plugins/old.xml", "old")?;
    install.publish("main", "plugins/chat.xml", "v1")?;
    install.mudsync().arg("update").assert().success();

    install.unpublish("main", "plugins/old.xml")?;
    install.publish("main", "plugins/chat.xml", "v2")?;

    install
        .mudsync()
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("* plugins/chat.xml"))
        .stdout(predicate::str::contains("- plugins/old.xml"))
        .stdout(predicate::str::contains("keep.txt").not());

    FileAssert::equals(install.install_path().join("plugins/chat.xml"), "v2");
    FileAssert::not_exists(install.install_path().join("plugins/old.xml"));
    FileAssert::equals(install.install_path().join(".old/plugins/old.xml"), "old");
    Ok(())
}

#[test]
fn test_user_config_is_never_overwritten() -> Result<()> {
    let install = TestInstall::new()?;
    install.publish("main", "mushclient.ini", "upstream ini")?;
    install.publish("main", "settings/colors.xml", "upstream colors")?;
    install.publish("main", "readme.txt", "hello")?;
    install.write_local("mushclient.ini", "my ini")?;
    install.write_local("settings/colors.xml", "my colors")?;

    install
        .mudsync()
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("= settings/colors.xml"));

    assert_eq!(install.read_local("mushclient.ini"), "my ini");
    assert_eq!(install.read_local("settings/colors.xml"), "my colors");
    assert_eq!(install.read_local("readme.txt"), "hello");
    Ok(())
}

#[test]
fn test_exclusions_are_honored() -> Result<()> {
    let install = TestInstall::new()?;
    install.publish("main", "sounds/hit.wav", "loud")?;
    install.publish("main", "readme.txt", "hello")?;
    install.write_local(".exclusions", "# keep my own sounds\nsounds/\n")?;

    install.mudsync().arg("update").assert().success();

    FileAssert::not_exists(install.install_path().join("sounds/hit.wav"));
    FileAssert::exists(install.install_path().join("readme.txt"));
    Ok(())
}

#[test]
fn test_full_reinstalls_modified_files() -> Result<()> {
    let install = TestInstall::new()?;
    install.publish("main", "scripts/init.lua", "original")?;
    install.mudsync().arg("update").assert().success();

    // The hash in the manifest still matches upstream, so a normal update keeps the edit.
    install.write_local("scripts/init.lua", "edited")?;
    install.mudsync().arg("update").assert().success();
    assert_eq!(install.read_local("scripts/init.lua"), "edited");

    install.mudsync().args(["update", "--full"]).assert().success();
    assert_eq!(install.read_local("scripts/init.lua"), "original");
    Ok(())
}

#[test]
fn test_channel_flag_is_not_persisted() -> Result<()> {
    let install = TestInstall::new()?;
    install.publish("main", "stable.txt", "S")?;
    install.publish("dev", "dev.txt", "D")?;

    install
        .mudsync()
        .args(["update", "--channel", "dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("+ dev.txt"));

    FileAssert::exists(install.install_path().join("dev.txt"));
    assert!(!install.read_local("mudsync.toml").contains("channel"));
    Ok(())
}

#[test]
fn test_quiet_prints_nothing() -> Result<()> {
    let install = TestInstall::new()?;
    install.publish("main", "x", "X1")?;

    install.mudsync().args(["-q", "update"]).assert().success().stdout(predicate::str::is_empty());
    FileAssert::exists(install.install_path().join("x"));
    Ok(())
}
