//! End-to-end CLI tests for the mediadock binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a command isolated from the user's config and data directories.
fn mediadock(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mediadock").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env_remove("RUST_LOG");
    cmd
}

/// Test that --help lists the subcommands and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    mediadock(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("download"))
        .stdout(predicate::str::contains("clear"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let home = TempDir::new().unwrap();
    mediadock(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mediadock"));
}

/// Test that a missing subcommand causes non-zero exit.
#[test]
fn test_binary_without_subcommand_returns_error() {
    let home = TempDir::new().unwrap();
    mediadock(&home).assert().failure();
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let home = TempDir::new().unwrap();
    mediadock(&home)
        .args(["list", "--invalid-flag"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Test that listing a fresh root prints nothing and succeeds.
#[test]
fn test_binary_list_empty_root() {
    let home = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    mediadock(&home)
        .args(["-q", "list", "--root"])
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

/// Test that --json lists entries as a JSON array.
#[test]
fn test_binary_list_json_shows_entries() {
    let home = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("videos")).unwrap();
    std::fs::write(root.path().join("videos/clip_1700000000000.mp4"), b"abc").unwrap();
    std::fs::write(root.path().join("videos/readme.txt"), b"skip").unwrap();

    mediadock(&home)
        .args(["list", "--json", "--root"])
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "\"storage_path\": \"videos/clip_1700000000000.mp4\"",
        ))
        .stdout(predicate::str::contains("\"size_bytes\": 3"))
        .stdout(predicate::str::contains("readme").not());
}

/// Test that the library root is read from the config file.
#[test]
fn test_binary_uses_config_file_root() {
    let home = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("videos")).unwrap();
    std::fs::write(root.path().join("videos/a_1.mkv"), b"x").unwrap();

    let config_dir = home.path().join("config").join("mediadock");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        format!("library_root = \"{}\"\n", root.path().display()),
    )
    .unwrap();

    mediadock(&home)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("videos/a_1.mkv"));
}

/// Test that an invalid config file fails with the offending key.
#[test]
fn test_binary_invalid_config_returns_error() {
    let home = TempDir::new().unwrap();
    let config_dir = home.path().join("config").join("mediadock");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "retries = 3\n").unwrap();

    mediadock(&home)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("retries"));
}

/// Test that deleting a missing entry fails with the not_found kind.
#[test]
fn test_binary_delete_missing_entry_fails() {
    let home = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("videos")).unwrap();

    mediadock(&home)
        .args(["delete", "missing.mp4", "--root"])
        .arg(root.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("[not_found]"));
}

/// Test that clear removes every video and reports the count.
#[test]
fn test_binary_clear_removes_videos() {
    let home = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("videos")).unwrap();
    std::fs::write(root.path().join("videos/a_1.mp4"), b"x").unwrap();
    std::fs::write(root.path().join("videos/b_2.webm"), b"y").unwrap();

    mediadock(&home)
        .args(["clear", "--root"])
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("removed 2"));

    assert!(!root.path().join("videos/a_1.mp4").exists());
    assert!(!root.path().join("videos/b_2.webm").exists());
}

/// Test that download stores the file and prints its storage path.
#[tokio::test(flavor = "multi_thread")]
async fn test_binary_download_stores_video() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/episode.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8; 4096]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let home = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();

    mediadock(&home)
        .args(["-q", "download"])
        .arg(format!("{}/episode.mp4", mock_server.uri()))
        .arg("--root")
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("videos/episode_"));

    let stored: Vec<_> = std::fs::read_dir(root.path().join("videos"))
        .unwrap()
        .map(|entry| entry.unwrap())
        .collect();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].metadata().unwrap().len(), 4096);
}

/// Test that an unsupported extension fails validation without a request.
#[test]
fn test_binary_download_rejects_unsupported_extension() {
    let home = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();

    mediadock(&home)
        .args(["download", "https://example.invalid/setup.exe", "--root"])
        .arg(root.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("[validation]"));
}
