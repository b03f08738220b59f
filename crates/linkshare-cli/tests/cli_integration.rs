//! CLI Integration Tests
//!
//! These tests verify the CLI commands work correctly end-to-end.
//! They test the "wiring" between the CLI and the core library.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Create a CLI command with a temporary data directory
fn cli_cmd(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("linkshare").expect("Failed to find linkshare binary");
    cmd.arg("--data-dir").arg(data_dir.path());
    cmd
}

fn set_names(data_dir: &TempDir, owner: &str) {
    cli_cmd(data_dir)
        .args(["profile", "set", owner, "--first-name", "Jane", "--last-name", "Doe"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile updated!"));
}

// ============================================================================
// Profile Command Tests
// ============================================================================

#[test]
fn test_profile_show_missing() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["profile", "show", "jane"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No profile for jane."));
}

#[test]
fn test_profile_set_then_show() {
    let data_dir = TempDir::new().unwrap();
    set_names(&data_dir, "jane");

    cli_cmd(&data_dir)
        .args(["profile", "show", "jane"])
        .assert()
        .success()
        .stdout(predicate::str::contains("First name: Jane"))
        .stdout(predicate::str::contains("Last name: Doe"))
        .stdout(predicate::str::contains("Email: (empty)"));
}

#[test]
fn test_profile_set_merges_fields() {
    let data_dir = TempDir::new().unwrap();
    set_names(&data_dir, "jane");

    cli_cmd(&data_dir)
        .args(["profile", "set", "jane", "--email", "jane@example.com"])
        .assert()
        .success();

    cli_cmd(&data_dir)
        .args(["profile", "show", "jane"])
        .assert()
        .success()
        .stdout(predicate::str::contains("First name: Jane"))
        .stdout(predicate::str::contains("Email: jane@example.com"));
}

#[test]
fn test_profile_set_requires_names() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["profile", "set", "jane", "--email", "jane@example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("First name can't be empty"));
}

#[test]
fn test_profile_set_rejects_bad_email() {
    let data_dir = TempDir::new().unwrap();
    set_names(&data_dir, "jane");

    cli_cmd(&data_dir)
        .args(["profile", "set", "jane", "--email", "not an email"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid email"));
}

#[test]
fn test_profile_set_with_avatar() {
    let data_dir = TempDir::new().unwrap();
    let avatar = data_dir.path().join("me.png");
    std::fs::write(&avatar, b"\x89PNG\r\n\x1a\n").unwrap();

    cli_cmd(&data_dir)
        .args(["profile", "set", "jane", "--first-name", "Jane", "--last-name", "Doe"])
        .arg("--avatar")
        .arg(&avatar)
        .assert()
        .success()
        .stdout(predicate::str::contains("profile_images/jane/avatar.png"));
}

#[test]
fn test_profile_set_rejects_non_image_avatar() {
    let data_dir = TempDir::new().unwrap();
    let notes = data_dir.path().join("notes.txt");
    std::fs::write(&notes, b"hello").unwrap();

    cli_cmd(&data_dir)
        .args(["profile", "set", "jane", "--first-name", "Jane", "--last-name", "Doe"])
        .arg("--avatar")
        .arg(&notes)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please upload an image file"));
}

#[test]
fn test_invalid_owner_id() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["profile", "show", "a/b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid owner id"));
}

// ============================================================================
// Links and Preview Tests
// ============================================================================

#[test]
fn test_links_add_and_list() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .args(["links", "add", "jane", "GitHub", "https://github.com/jane"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Link added!"));

    cli_cmd(&data_dir)
        .args(["links", "add", "jane", "Mastodon", "https://mastodon.social/@jane"])
        .assert()
        .success()
        .stderr(predicate::str::contains("not a known platform"));

    cli_cmd(&data_dir)
        .args(["links", "list", "jane"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Links for jane (2)"))
        .stdout(predicate::str::contains("hidden from preview"));
}

#[test]
fn test_links_remove() {
    let data_dir = TempDir::new().unwrap();

    let output = cli_cmd(&data_dir)
        .args(["links", "add", "jane", "GitHub", "https://github.com/jane"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let id = stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("ID: "))
        .expect("link id in output")
        .to_string();

    // Another owner cannot remove it
    cli_cmd(&data_dir)
        .args(["links", "remove", "john", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No link"));

    cli_cmd(&data_dir)
        .args(["links", "remove", "jane", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Link removed."));

    cli_cmd(&data_dir)
        .args(["links", "list", "jane"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No links for jane."));

    cli_cmd(&data_dir)
        .args(["links", "remove", "jane", "not-a-ulid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid link id"));
}

#[test]
fn test_preview_filters_unknown_platforms() {
    let data_dir = TempDir::new().unwrap();
    set_names(&data_dir, "jane");
    cli_cmd(&data_dir)
        .args(["links", "add", "jane", "YouTube", "https://youtube.com/@jane"])
        .assert()
        .success();
    cli_cmd(&data_dir)
        .args(["links", "add", "jane", "Mastodon", "https://mastodon.social/@jane"])
        .assert()
        .success();

    cli_cmd(&data_dir)
        .args(["preview", "jane"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Jane Doe"))
        .stdout(predicate::str::contains("YouTube [#EE3939]"))
        .stdout(predicate::str::contains("mastodon").not());
}

#[test]
fn test_preview_mockup_has_five_slots() {
    let data_dir = TempDir::new().unwrap();
    set_names(&data_dir, "jane");
    cli_cmd(&data_dir)
        .args(["links", "add", "jane", "GitHub", "https://github.com/jane"])
        .assert()
        .success();

    cli_cmd(&data_dir)
        .args(["preview", "jane", "--mockup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. GitHub"))
        .stdout(predicate::str::contains("5. (empty)"));
}

#[test]
fn test_preview_missing_profile_fails() {
    let data_dir = TempDir::new().unwrap();
    let config = data_dir.path().join("linkshare.toml");
    std::fs::write(&config, "preview_timeout_secs = 1\n").unwrap();

    cli_cmd(&data_dir)
        .args(["preview", "nobody"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No profile for nobody"));
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_defaults() {
    let data_dir = TempDir::new().unwrap();

    cli_cmd(&data_dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("idle_timeout_secs = 1800"))
        .stdout(predicate::str::contains("max_asset_bytes = 5242880"));
}

#[test]
fn test_config_file_overrides() {
    let data_dir = TempDir::new().unwrap();
    let config = data_dir.path().join("custom.toml");
    std::fs::write(&config, "max_asset_bytes = 1024\n").unwrap();

    cli_cmd(&data_dir)
        .arg("--config")
        .arg(&config)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("max_asset_bytes = 1024"));
}

#[test]
fn test_config_invalid_file() {
    let data_dir = TempDir::new().unwrap();
    let config = data_dir.path().join("bad.toml");
    std::fs::write(&config, "idle_timeout_secs = 0\n").unwrap();

    cli_cmd(&data_dir)
        .arg("--config")
        .arg(&config)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("idle_timeout_secs"));
}

#[test]
fn test_help() {
    Command::cargo_bin("linkshare")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("profile"))
        .stdout(predicate::str::contains("preview"));
}
