//! Integration tests for the two binaries.
//!
//! The client is interactive, so these drive it through stdin and keep
//! to cases that need no server (help, version, unreachable address).

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;

/// Helper: get a Command pointing at the client binary.
fn keeper() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("keeper").expect("binary should exist");
    cmd.env_remove("KEEPER_ADDRESS").env_remove("KEEPER_CONFIG");
    cmd
}

/// Helper: get a Command pointing at the server binary.
fn keeper_server() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("keeper-server").expect("binary should exist")
}

#[test]
fn client_help_shows_options() {
    keeper()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Interactive client"))
        .stdout(predicate::str::contains("--address"))
        .stdout(predicate::str::contains("--gzip"));
}

#[test]
fn client_version_shows_version() {
    keeper()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("keeper"));
}

#[test]
fn server_help_shows_options() {
    keeper_server()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--database"))
        .stdout(predicate::str::contains("--token-ttl"))
        .stdout(predicate::str::contains("--lenient-uploads"));
}

#[test]
fn exit_command_ends_the_client() {
    let tmp = TempDir::new().unwrap();
    keeper()
        .current_dir(tmp.path())
        .args(["--address", "http://127.0.0.1:9"])
        .write_stdin("exit\n")
        .assert()
        .success();
}

#[test]
fn help_command_lists_commands() {
    let tmp = TempDir::new().unwrap();
    keeper()
        .current_dir(tmp.path())
        .write_stdin("help\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("register"))
        .stdout(predicate::str::contains("delete"));
}

#[test]
fn unknown_command_is_reported_and_the_loop_continues() {
    let tmp = TempDir::new().unwrap();
    keeper()
        .current_dir(tmp.path())
        .write_stdin("launch\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Unknown command 'launch'"));
}

#[test]
fn broken_config_file_is_fatal() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("keeper.toml"), "not valid {{toml").unwrap();

    keeper()
        .current_dir(tmp.path())
        .write_stdin("exit\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file error"));
}

#[test]
fn server_with_unbindable_address_fails() {
    let tmp = TempDir::new().unwrap();
    keeper_server()
        .current_dir(tmp.path())
        .args(["--address", "not-an-address", "--database", ":memory:"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to bind"));
}
