//! End-to-end CLI tests for the quiz-bundler binary.

// `Command::cargo_bin` is deprecated in assert_cmd >=2.0.17 in favor of
// `cargo::cargo_bin_cmd!` macro. Suppressed until migration to the new API.
#![allow(deprecated)]

mod support;
use support::socket_guard::{socket_skip_return, start_mock_server_or_skip};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_bundler_config(config_home: &std::path::Path, contents: &str) {
    let config_dir = config_home.join("quiz-bundler");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), contents).unwrap();
}

/// Command isolated from the user's config and log settings.
fn bundler_cmd(tempdir: &TempDir) -> Command {
    let config_home = tempdir.path().join("xdg-config");
    std::fs::create_dir_all(&config_home).unwrap();
    let mut cmd = Command::cargo_bin("quiz-bundler").unwrap();
    cmd.env("XDG_CONFIG_HOME", &config_home)
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .current_dir(tempdir.path());
    cmd
}

async fn mount_small_group(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/groups/ABC123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "ABC123",
            "name": "Sample",
            "publisher_name": "Acme",
            "questions": [{
                "id": 1,
                "question_text": "Q?",
                "image_url": format!("{}/media/q1.png", server.uri()),
                "answers": [{ "answer_text": "A", "is_correct": true }]
            }]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/publishers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "Acme", "logo_url": format!("{}/logos/acme.png", server.uri()) }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/q1.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/logos/acme.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"logo".to_vec()))
        .mount(server)
        .await;
}

#[test]
fn test_help_lists_profile_flag() {
    let tempdir = TempDir::new().unwrap();
    bundler_cmd(&tempdir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--profile"))
        .stdout(predicate::str::contains("--output-root"));
}

#[test]
fn test_missing_profile_is_usage_error() {
    let tempdir = TempDir::new().unwrap();
    bundler_cmd(&tempdir)
        .arg("ABC123")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--profile"));
}

#[test]
fn test_missing_api_base_exits_with_config_error() {
    let tempdir = TempDir::new().unwrap();
    let assert = bundler_cmd(&tempdir)
        .args(["ABC123", "--profile", "web"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("api_base_url"));
    assert_eq!(assert.get_output().status.code(), Some(1));
}

#[test]
fn test_unknown_config_key_exits_with_config_error() {
    let tempdir = TempDir::new().unwrap();
    write_bundler_config(
        &tempdir.path().join("xdg-config"),
        "api_base_url = \"http://127.0.0.1:9\"\nretries = 3\n",
    );
    let assert = bundler_cmd(&tempdir)
        .args(["ABC123", "--profile", "engine"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
    assert_eq!(assert.get_output().status.code(), Some(1));
}

#[test]
fn test_invalid_code_exits_with_invalid_request() {
    let tempdir = TempDir::new().unwrap();
    let assert = bundler_cmd(&tempdir)
        .args([
            "a/b",
            "--profile",
            "web",
            "--api-base-url",
            "http://127.0.0.1:9",
            "-q",
        ])
        .assert()
        .failure();
    assert_eq!(assert.get_output().status.code(), Some(2));
    assert!(assert.get_output().stdout.is_empty());
}

#[tokio::test]
async fn test_unknown_group_exits_with_fetch_error() {
    let Some(server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    Mock::given(method("GET"))
        .and(path("/groups/NOPE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tempdir = TempDir::new().unwrap();
    let output_root = tempdir.path().join("out");
    let assert = bundler_cmd(&tempdir)
        .args(["NOPE", "--profile", "web", "--no-progress"])
        .arg("--api-base-url")
        .arg(server.uri())
        .arg("--output-root")
        .arg(&output_root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("NOPE"));
    assert_eq!(assert.get_output().status.code(), Some(3));
    assert!(!output_root.join("questions").exists());
}

#[tokio::test]
async fn test_successful_run_prints_report_json() {
    let Some(server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    mount_small_group(&server).await;

    let tempdir = TempDir::new().unwrap();
    let output_root = tempdir.path().join("out");
    let assert = bundler_cmd(&tempdir)
        .args(["ABC123", "--profile", "web", "-q"])
        .arg("--api-base-url")
        .arg(server.uri())
        .arg("--output-root")
        .arg(&output_root)
        .assert()
        .success();

    let report: Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("stdout should be JSON");
    assert_eq!(report["code"], "ABC123");
    assert_eq!(report["profile"], "web_client");
    assert_eq!(report["question_count"], 1);
    assert_eq!(report["images_succeeded"], 1);
    assert_eq!(report["logo_succeeded"], true);
    assert_eq!(report["logo_tier"], "publisher_map");
    assert!(output_root.join("questions").join("question.json").is_file());
    assert!(output_root.join("questions").join("logo.png").is_file());
}

#[tokio::test]
async fn test_config_file_supplies_api_base_and_output_root() {
    let Some(server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    mount_small_group(&server).await;

    let tempdir = TempDir::new().unwrap();
    let output_root = tempdir.path().join("from-config");
    write_bundler_config(
        &tempdir.path().join("xdg-config"),
        &format!(
            "api_base_url = \"{}\"\noutput_root = \"{}\"\nverbosity = \"quiet\"\n",
            server.uri(),
            output_root.display()
        ),
    );

    bundler_cmd(&tempdir)
        .args(["ABC123", "--profile", "engine"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"question_count\": 1"));

    assert!(
        output_root
            .join("Questions")
            .join("QuestionsData.json")
            .is_file()
    );
    assert!(output_root.join("Logo").join("logo.png").is_file());
}

#[tokio::test]
async fn test_default_output_root_is_under_bundles_dir() {
    let Some(server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    mount_small_group(&server).await;

    let tempdir = TempDir::new().unwrap();
    bundler_cmd(&tempdir)
        .args(["ABC123", "--profile", "engine", "-q"])
        .arg("--api-base-url")
        .arg(server.uri())
        .assert()
        .success();

    assert!(
        tempdir
            .path()
            .join("bundles/engine/ABC123/Questions/QuestionsData.json")
            .is_file()
    );
}
