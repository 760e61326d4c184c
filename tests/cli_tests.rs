//! CLI integration tests
//!
//! These run the built binary in an empty working directory with provider keys
//! removed, so no test reaches a real search API.

use std::process::{Command, Output};
use tempfile::TempDir;

const KEY_VARS: &[&str] = &[
    "SERPER_API_KEY",
    "BRAVE_API_KEY",
    "TAVILY_API_KEY",
    "TAVILY_API_KEY_2",
    "PERPLEXITY_API_KEY",
    "EXA_API_KEY",
    "JINA_API_KEY",
    "SEARCH_TIMEOUT_SECONDS",
    "SEARCH_GATEWAY_CONFIG",
];

/// Run the CLI and capture (stdout, stderr, success)
fn run_cli_in(dir: &TempDir, args: &[&str]) -> (String, String, bool) {
    let mut command = Command::new(env!("CARGO_BIN_EXE_search-gateway"));
    command.args(args).current_dir(dir.path());
    for var in KEY_VARS {
        command.env_remove(var);
    }

    let output: Output = command.output().expect("Failed to execute CLI command");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn run_cli(args: &[&str]) -> (String, String, bool) {
    let dir = TempDir::new().unwrap();
    run_cli_in(&dir, args)
}

#[test]
fn test_cli_help() {
    let (stdout, _stderr, success) = run_cli(&["--help"]);

    assert!(success, "Help command should succeed");
    assert!(stdout.contains("Multi-provider search gateway CLI"));
    assert!(stdout.contains("web"));
    assert!(stdout.contains("code"));
    assert!(stdout.contains("fetch"));
    assert!(stdout.contains("providers"));
}

#[test]
fn test_cli_version() {
    let (stdout, _stderr, success) = run_cli(&["--version"]);

    assert!(success, "Version command should succeed");
    assert!(stdout.contains("search-gateway"));
}

#[test]
fn test_web_help_lists_options() {
    let (stdout, _stderr, success) = run_cli(&["web", "--help"]);

    assert!(success);
    assert!(stdout.contains("--provider"));
    assert!(stdout.contains("--max-results"));
    assert!(stdout.contains("--format"));
}

#[test]
fn test_providers_without_keys() {
    let (stdout, _stderr, success) = run_cli(&["providers"]);

    assert!(success, "Providers command should succeed");
    assert!(stdout.contains("Search Providers:"));
    assert!(stdout.contains("grep_app"));
    assert!(stdout.contains("jina"));
    assert!(stdout.contains("serper"));
    assert!(stdout.contains("no API key configured"));
    assert!(stdout.contains("disabled"));
}

#[test]
fn test_providers_reads_config_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.yaml"),
        "providers:\n  jina:\n    enabled: false\n  serper:\n    api_key: test-key\n    weight: 7\n",
    )
    .unwrap();

    let (stdout, _stderr, success) = run_cli_in(&dir, &["providers"]);

    assert!(success);
    assert!(stdout.contains("weight 7"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.yaml"),
        "providers:\n  bing:\n    weight: 10\n",
    )
    .unwrap();

    let (_stdout, stderr, success) = run_cli_in(&dir, &["providers"]);

    assert!(!success);
    assert!(stderr.contains("Failed to load configuration"));
}

#[test]
fn test_empty_query_is_rejected() {
    let (_stdout, stderr, success) = run_cli(&["web", "   "]);

    assert!(!success);
    assert!(stderr.contains("**Error:**"));
    assert!(stderr.contains("empty"));
}

#[test]
fn test_zero_max_results_is_rejected() {
    let (_stdout, stderr, success) = run_cli(&["web", "rust", "--max-results", "0"]);

    assert!(!success);
    assert!(stderr.contains("**Error:**"));
}

#[test]
fn test_unknown_provider_is_rejected() {
    let (_stdout, stderr, success) = run_cli(&["web", "rust", "--provider", "bing"]);

    assert!(!success);
    assert!(stderr.contains("bing"));
}

#[test]
fn test_fetch_rejects_non_http_url() {
    let (_stdout, stderr, success) = run_cli(&["fetch", "ftp://example.com/file"]);

    assert!(!success);
    assert!(stderr.contains("**Error:**"));
}

#[test]
fn test_invalid_format_is_a_usage_error() {
    let (_stdout, stderr, success) = run_cli(&["web", "rust", "--format", "xml"]);

    assert!(!success);
    assert!(stderr.contains("invalid value"));
}
