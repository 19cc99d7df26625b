//! Compiled-binary behavior: flags, exit codes, and output surfaces.

use armory::digest;
use armory::platform::Platform;
use armory::test_utils::InstallSandbox;
use predicates::prelude::*;

/// An armory command isolated from any real user configuration.
fn armory_command(sandbox: &InstallSandbox) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("armory").unwrap();
    // Point at a config file that does not exist, so defaults apply.
    cmd.env("ARMORY_CONFIG", sandbox.temp_dir.path().join("absent-config.toml"));
    cmd
}

/// Plant an installed binary plus matching sidecar.
fn plant(sandbox: &InstallSandbox, version_dir: &str, bytes: &[u8]) {
    let dir = sandbox.install_dir("kite", version_dir);
    std::fs::create_dir_all(&dir).unwrap();
    let binary = dir.join(Platform::current().binary_file_name("kite"));
    std::fs::write(&binary, bytes).unwrap();
    std::fs::write(digest::sidecar_path(&dir), digest::hash_bytes(bytes)).unwrap();
}

/// Test that --help names every subcommand
#[test]
fn test_help_lists_subcommands() {
    let sandbox = InstallSandbox::new().unwrap();

    armory_command(&sandbox)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("verify"));
}

/// Test that a malformed version fails fast, before any network access
#[test]
fn test_install_rejects_malformed_version_offline() {
    let sandbox = InstallSandbox::new().unwrap();

    armory_command(&sandbox)
        .args(["install", "kite", "--version", "not-a-version"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid version"));
}

/// Test that a missing server URL is reported as a config problem
#[test]
fn test_install_without_server_is_a_config_error() {
    let sandbox = InstallSandbox::new().unwrap();

    armory_command(&sandbox)
        .args(["install", "kite"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no artifact server configured"));
}

/// Test verify against an untouched install
#[test]
fn test_verify_accepts_valid_install() {
    let sandbox = InstallSandbox::new().unwrap();
    plant(&sandbox, "latest", b"kite payload");

    armory_command(&sandbox)
        .args(["verify", "kite", "--dir"])
        .arg(&sandbox.base_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("matches its recorded digest"));
}

/// Test verify exit code when the binary changed after install
#[test]
fn test_verify_fails_on_tampered_binary() {
    let sandbox = InstallSandbox::new().unwrap();
    plant(&sandbox, "latest", b"kite payload");
    std::fs::write(sandbox.binary_path("kite", "latest"), b"tampered").unwrap();

    armory_command(&sandbox)
        .args(["verify", "kite", "--dir"])
        .arg(&sandbox.base_dir)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("does not match its recorded digest"));
}

/// Test status text output with multiple versions installed
#[test]
fn test_status_lists_installed_versions() {
    let sandbox = InstallSandbox::new().unwrap();
    plant(&sandbox, "2.7.0", &[0x11; 256]);
    plant(&sandbox, "latest", &[0x22; 256]);

    armory_command(&sandbox)
        .args(["status", "kite", "--dir"])
        .arg(&sandbox.base_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Version"))
        .stdout(predicate::str::contains("2.7.0"))
        .stdout(predicate::str::contains("latest"));
}

/// Test status JSON output parses and carries the row fields
#[test]
fn test_status_json_is_machine_readable() {
    let sandbox = InstallSandbox::new().unwrap();
    plant(&sandbox, "2.7.0", &[0x33; 256]);

    let output = armory_command(&sandbox)
        .args(["status", "kite", "--format", "json", "--dir"])
        .arg(&sandbox.base_dir)
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["version"], "2.7.0");
    assert_eq!(rows[0]["size_bytes"], 256);
    assert_eq!(rows[0]["usable"], false);
}

/// Test status when nothing is installed under the directory
#[test]
fn test_status_reports_nothing_installed() {
    let sandbox = InstallSandbox::new().unwrap();

    armory_command(&sandbox)
        .args(["status", "kite", "--dir"])
        .arg(&sandbox.base_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("is not installed"));
}
