//! Startup-error behavior of the `filepulse` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn serve_without_a_path_is_a_usage_error() {
    Command::cargo_bin("filepulse")
        .expect("binary")
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<PATH>"));
}

#[test]
fn serve_with_a_missing_path_fails_at_startup() {
    let dir = TempDir::new().expect("tempdir");
    Command::cargo_bin("filepulse")
        .expect("binary")
        .arg("serve")
        .arg(dir.path().join("absent.log"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("watch target does not exist"));
}

#[test]
fn subscribe_against_nothing_fails_with_a_connect_error() {
    // Port 1 is privileged and essentially never listened on.
    Command::cargo_bin("filepulse")
        .expect("binary")
        .args(["subscribe", "--port", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to connect"));
}

#[test]
fn unknown_subcommand_is_rejected() {
    Command::cargo_bin("filepulse")
        .expect("binary")
        .arg("broadcast")
        .assert()
        .failure();
}
