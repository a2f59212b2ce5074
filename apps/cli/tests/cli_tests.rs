//! 命令行端到端测试（不需要 CAN 硬件）

use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    Command::cargo_bin("bhand-cli").unwrap()
}

#[test]
fn test_decode_property_reply() {
    cli()
        .args(["decode", "0x566", "88000500"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mode(8) = 5"))
        .stdout(predicate::str::contains("Trapezoid"));
}

#[test]
fn test_decode_rejects_bad_hex() {
    cli().args(["decode", "11", "xyz"]).assert().failure();
}

#[test]
fn test_config_show_default() {
    cli()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("interface = \"can0\""))
        .stdout(predicate::str::contains("tick_period_us = 2000"));
}

#[test]
fn test_config_init_and_check() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hand.toml");
    let path = path.to_str().unwrap();

    cli().args(["config", "init", path]).assert().success();
    cli()
        .args(["config", "check", path])
        .assert()
        .success()
        .stdout(predicate::str::contains("配置有效"));
}

#[test]
fn test_run_rejects_invalid_joints() {
    cli()
        .args(["run", "--joints", "1.0,1.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("4"));
}
