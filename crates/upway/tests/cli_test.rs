//! Integration tests for the `upway` binary.
//!
//! Argument parsing, help output and configuration failures, all without a
//! portal or broker.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

const SETTINGS: &[&str] = &[
    "MQTT_HOST",
    "MQTT_PORT",
    "MQTT_TOPIC",
    "MQTT_DISCOVERY_PREFIX",
    "MQTT_CLIENT_ID",
    "MQTT_USERNAME",
    "MQTT_PASSWORD",
    "UPDATE_INTERVAL",
    "MYUPWAY_USERNAME",
    "MYUPWAY_PASSWORD",
    "MYUPWAY_SYSTEM_ID",
    "MYUPWAY_BASE_URL",
    "HTTP_TIMEOUT",
    "SHUTDOWN_TIMEOUT",
    "UPWAY_CONFIG",
    "UPWAY_LOG_FORMAT",
];

/// Build a [`Command`] for the `upway` binary with env isolation.
fn upway_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("upway");
    cmd.env("HOME", "/tmp/upway-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/upway-cli-test-nonexistent")
        .env_remove("RUST_LOG");
    for key in SETTINGS {
        cmd.env_remove(key);
    }
    cmd
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    upway_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("MQTT")
            .and(predicate::str::contains("--once"))
            .and(predicate::str::contains("--dry-run"))
            .and(predicate::str::contains("--config")),
    );
}

#[test]
fn test_version_flag() {
    upway_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_flag_is_usage_error() {
    upway_cmd().arg("--bogus").assert().code(2);
}

#[test]
fn test_invalid_log_format_is_usage_error() {
    upway_cmd()
        .args(["--log-format", "xml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("xml"));
}

// ── Configuration failures ──────────────────────────────────────────

#[test]
fn test_missing_settings_exit_with_usage_code() {
    upway_cmd()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("MYUPWAY_USERNAME"));
}

#[test]
fn test_fatal_error_is_reported_once() {
    upway_cmd()
        .assert()
        .code(2)
        .stderr(predicate::function(|stderr: &str| {
            stderr.matches("MYUPWAY_USERNAME is not set").count() == 1
        }));
}

#[test]
fn test_missing_broker_is_reported() {
    upway_cmd()
        .env("MYUPWAY_USERNAME", "me@example.com")
        .env("MYUPWAY_PASSWORD", "pw")
        .env("MYUPWAY_SYSTEM_ID", "123456")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("MQTT_HOST"));
}

#[test]
fn test_zero_interval_is_rejected() {
    upway_cmd()
        .env("MQTT_HOST", "localhost")
        .env("MYUPWAY_USERNAME", "me@example.com")
        .env("MYUPWAY_PASSWORD", "pw")
        .env("MYUPWAY_SYSTEM_ID", "123456")
        .env("UPDATE_INTERVAL", "0")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("UPDATE_INTERVAL"));
}

#[test]
fn test_missing_config_file_is_usage_error() {
    upway_cmd()
        .args(["--config", "/tmp/upway-cli-test-nonexistent/none.toml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn test_unreachable_portal_fails_startup() {
    upway_cmd()
        .args(["--dry-run", "--once"])
        .env("MYUPWAY_USERNAME", "me@example.com")
        .env("MYUPWAY_PASSWORD", "pw")
        .env("MYUPWAY_SYSTEM_ID", "123456")
        .env("MYUPWAY_BASE_URL", "http://127.0.0.1:1/")
        .env("HTTP_TIMEOUT", "2")
        .assert()
        .code(7);
}
