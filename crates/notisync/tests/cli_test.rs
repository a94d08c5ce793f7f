//! Integration tests for the `notisync` CLI binary.
//!
//! Argument parsing, completions, config handling, and error exit codes
//! run without a server; the inbox commands run against wiremock.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `notisync` binary with env isolation.
///
/// Clears all `NOTISYNC_*` env vars and points the config file into `dir`
/// so tests never touch the user's real configuration or keyring.
fn notisync_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("notisync");
    cmd.env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir)
        .env("NOTISYNC_CONFIG", config_file(dir))
        .env("NO_COLOR", "1")
        .env_remove("DBUS_SESSION_BUS_ADDRESS")
        .env_remove("NOTISYNC_PROFILE")
        .env_remove("NOTISYNC_API_URL")
        .env_remove("NOTISYNC_TOKEN")
        .env_remove("NOTISYNC_OUTPUT")
        .env_remove("NOTISYNC_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn config_file(dir: &Path) -> PathBuf {
    dir.join("config.toml")
}

fn write_config(dir: &Path, body: &str) {
    std::fs::write(config_file(dir), body).unwrap();
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run the binary off the async runtime so wiremock keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

fn page_body(ids: &[&str], page: u32, total: u64) -> serde_json::Value {
    let notifications: Vec<_> = ids
        .iter()
        .map(|id| {
            json!({
                "_id": id,
                "title": format!("Title {id}"),
                "description": "body",
                "read": false,
                "type": "activity",
                "priority": "normal",
                "timestamp": "2026-01-05T10:00:00Z"
            })
        })
        .collect();
    json!({
        "notifications": notifications,
        "pagination": { "page": page, "limit": 2, "total": total }
    })
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = TempDir::new().unwrap();
    let output = notisync_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    notisync_cmd(dir.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("list")
            .and(predicate::str::contains("read-all"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    notisync_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("notisync"));
}

#[test]
fn test_invalid_subcommand() {
    let dir = TempDir::new().unwrap();
    let output = notisync_cmd(dir.path()).arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_list_rejects_unknown_type() {
    let dir = TempDir::new().unwrap();
    notisync_cmd(dir.path())
        .args(["list", "--type", "billing"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("billing"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let dir = TempDir::new().unwrap();
    notisync_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let dir = TempDir::new().unwrap();
    notisync_cmd(dir.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_override() {
    let dir = TempDir::new().unwrap();
    notisync_cmd(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            config_file(dir.path()).display().to_string(),
        ));
}

#[test]
fn test_config_show_masks_token() {
    let dir = TempDir::new().unwrap();
    write_config(
        dir.path(),
        r#"
default_profile = "work"

[profiles.work]
api_url = "https://api.example.com/api"
token = "super-secret"
page_size = 25
"#,
    );

    notisync_cmd(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[profiles.work]")
                .and(predicate::str::contains("page_size = 25"))
                .and(predicate::str::contains("super-secret").not()),
        );

    let output = notisync_cmd(dir.path())
        .args(["config", "show", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["profiles"]["work"]["token"], "****");
    assert_eq!(parsed["default_profile"], "work");
}

#[test]
fn test_set_token_requires_known_profile() {
    let dir = TempDir::new().unwrap();
    notisync_cmd(dir.path())
        .args(["config", "set-token", "--profile", "ghost", "--value", "abc"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("ghost"));
}

// ── Error exit codes ────────────────────────────────────────────────

#[test]
fn test_list_without_config_is_usage_error() {
    let dir = TempDir::new().unwrap();
    notisync_cmd(dir.path())
        .arg("list")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("config init"));
}

#[test]
fn test_unknown_profile_lists_available() {
    let dir = TempDir::new().unwrap();
    write_config(
        dir.path(),
        r#"
[profiles.home]
api_url = "https://api.example.com/api"
"#,
    );

    notisync_cmd(dir.path())
        .args(["list", "--profile", "work"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("home"));
}

#[test]
fn test_missing_token_is_auth_error() {
    let dir = TempDir::new().unwrap();
    notisync_cmd(dir.path())
        .args(["list", "--api-url", "http://127.0.0.1:9/api"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("NOTISYNC_TOKEN"));
}

#[test]
fn test_invalid_api_url_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_config(
        dir.path(),
        r#"
[profiles.default]
api_url = "not a url"
token = "t"
"#,
    );

    notisync_cmd(dir.path())
        .arg("list")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("api_url"));
}

// ── Inbox commands against a mock server ────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_list_json_uses_filters_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/notifications"))
        .and(header("Authorization", "Bearer cli-token"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "2"))
        .and(query_param("status", "unread"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&["n1", "n2"], 1, 2)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = notisync_cmd(dir.path());
    cmd.args(["list", "--status", "unread", "--limit", "2", "-o", "json"])
        .args(["--api-url", &server.uri(), "--token", "cli-token"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<_> = parsed
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(ids, ["n1", "n2"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_page_two_shows_only_that_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/notifications"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&["n1", "n2"], 1, 3)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/notifications"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&["n3"], 2, 3)))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = notisync_cmd(dir.path());
    cmd.args(["list", "--page", "2", "--limit", "2", "-o", "plain"])
        .args(["--api-url", &server.uri(), "--token", "t"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "n3");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_read_marks_notification() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/users/notifications/n1/read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = notisync_cmd(dir.path());
    cmd.args(["read", "n1", "--api-url", &server.uri(), "--token", "t"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Marked n1 as read"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_missing_notification_exits_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/users/notifications/ghost"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Notification not found" })),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = notisync_cmd(dir.path());
    cmd.args(["delete", "ghost", "--api-url", &server.uri(), "--token", "t"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("ghost"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_token_exits_auth() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/users/notifications/mark-all-read"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "expired" })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = notisync_cmd(dir.path());
    cmd.args(["read-all", "--api-url", &server.uri(), "--token", "stale"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_page_slices_by_what_each_page_added() {
    let server = MockServer::start().await;
    // A short first page shifts where page 2 begins.
    Mock::given(method("GET"))
        .and(path("/users/notifications"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&["n1"], 1, 3)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/notifications"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&["n1", "n2"], 2, 3)))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = notisync_cmd(dir.path());
    cmd.args(["list", "--page", "2", "--limit", "2", "-o", "plain"])
        .args(["--api-url", &server.uri(), "--token", "t"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "n2");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_open_marks_read_and_prints_link() {
    let server = MockServer::start().await;
    let mut body = page_body(&["n1", "n2"], 1, 2);
    body["notifications"][1]["link"] = json!("/activities/n2");
    Mock::given(method("GET"))
        .and(path("/users/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/users/notifications/n2/read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = notisync_cmd(dir.path());
    cmd.args(["open", "n2", "-o", "plain"])
        .args(["--api-url", &server.uri(), "--token", "t"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "/activities/n2");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Marked n2 as read"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_open_unknown_notification_exits_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&["n1"], 1, 1)))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = notisync_cmd(dir.path());
    cmd.args(["open", "ghost", "--api-url", &server.uri(), "--token", "t"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("ghost"));
}
