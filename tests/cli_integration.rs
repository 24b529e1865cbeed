//! Integration tests for the command-line surface.

#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_lists_run_options() {
    let mut cmd = cargo_bin_cmd!("feedercam");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--fake-motion"))
        .stdout(predicate::str::contains("--strategy"))
        .stdout(predicate::str::contains("species"));
}

#[test]
fn test_config_path_honours_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feedercam.toml");

    let mut cmd = cargo_bin_cmd!("feedercam");
    cmd.arg("--config").arg(&path).args(["config", "path"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(path.to_string_lossy().as_ref()));
}

#[test]
fn test_config_init_then_show() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("feedercam.toml");

    cargo_bin_cmd!("feedercam")
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));
    assert!(path.exists());

    cargo_bin_cmd!("feedercam")
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    cargo_bin_cmd!("feedercam")
        .env("API_URL_BASE", "http://feeder.local:8000/api")
        .arg("--config")
        .arg(&path)
        .args(["config", "show", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max_record_seconds"))
        .stdout(predicate::str::contains("http://feeder.local:8000/api"));
}

#[test]
fn test_unparseable_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[processor\nmax_record_seconds = ").unwrap();

    cargo_bin_cmd!("feedercam")
        .arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_invalid_config_rejected_before_startup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invalid.toml");
    std::fs::write(&path, "[processor]\nmax_record_seconds = -5.0\n").unwrap();

    cargo_bin_cmd!("feedercam")
        .arg("--config")
        .arg(&path)
        .arg("-q")
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_record_seconds"));
}

#[test]
fn test_unknown_strategy_rejected() {
    cargo_bin_cmd!("feedercam")
        .args(["--strategy", "three_stage"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
