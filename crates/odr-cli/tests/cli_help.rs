use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_question_and_commands() {
    cargo_bin_cmd!("odr")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("QUESTION"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_config_help_shows_subcommands() {
    cargo_bin_cmd!("odr")
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("path"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("odr")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1"));
}
