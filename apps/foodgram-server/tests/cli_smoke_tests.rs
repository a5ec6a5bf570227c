//! CLI smoke tests for the foodgram-server binary
//!
//! These run the compiled binary against throwaway home directories and
//! config files.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

/// Helper to run the foodgram-server binary with given arguments
fn run_foodgram_server(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_foodgram-server"))
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute foodgram-server")
}

/// Helper to run the foodgram-server binary with timeout
async fn run_foodgram_server_with_timeout(
    args: &[&str],
    timeout_duration: Duration,
) -> Result<std::process::Output, Box<dyn std::error::Error>> {
    let mut cmd = tokio::process::Command::new(env!("CARGO_BIN_EXE_foodgram-server"));
    cmd.args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    match timeout(timeout_duration, cmd.output()).await {
        Ok(result) => result.map_err(|e| e.into()),
        Err(elapsed) => Err(elapsed.into()),
    }
}

/// Write a config whose home dir and database live inside `dir`.
fn write_config(dir: &Path, extra: &str) -> String {
    let home = dir.join("home");
    let content = format!(
        r#"
server:
  home_dir: "{home}"
  host: "127.0.0.1"
  port: 0

database:
  url: "sqlite://database/foodgram.db"

logging:
  default:
    console_level: warn
    file: ""
    file_level: info
{extra}"#,
        home = home.to_string_lossy().replace('\\', "/"),
    );
    let path = dir.join("foodgram.yaml");
    std::fs::write(&path, content).expect("Failed to write config file");
    path.to_string_lossy().to_string()
}

#[test]
fn test_cli_help_command() {
    let output = run_foodgram_server(&["--help"]);

    assert!(output.status.success(), "Help command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("foodgram-server"), "Should contain binary name");
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    for sub in ["run", "check", "migrate", "load-ingredients", "load-tags"] {
        assert!(stdout.contains(sub), "Should list '{sub}' subcommand");
    }
    assert!(stdout.contains("--config"), "Should mention config option");
}

#[test]
fn test_cli_version_command() {
    let output = run_foodgram_server(&["--version"]);

    assert!(output.status.success(), "Version command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("foodgram-server 0.1.0"), "{stdout}");
}

#[test]
fn test_cli_invalid_command() {
    let output = run_foodgram_server(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "{stderr}");
}

#[test]
fn test_cli_config_validation_missing_file() {
    let output = run_foodgram_server(&["-c", "/nonexistent/config.yaml", "check"]);

    assert!(!output.status.success(), "Should fail with missing config");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("config") || stderr.contains("file") || stderr.contains("found"),
        "Should mention config file issue: {}",
        stderr
    );
}

#[test]
fn test_cli_config_validation_invalid_yaml() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("invalid.yaml");
    std::fs::write(&config_path, "invalid: yaml: content: [unclosed")
        .expect("Failed to write file");

    let output = run_foodgram_server(&["--config", config_path.to_str().unwrap(), "check"]);

    assert!(!output.status.success(), "Should fail with invalid YAML");
}

#[test]
fn test_cli_check_valid_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(
        temp_dir.path(),
        r#"
modules:
  recipes:
    default_page_size: 10
    shopping_list_title: "To buy"
"#,
    );

    let output = run_foodgram_server(&["--config", &config, "check"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "STDOUT: {stdout}\nSTDERR: {stderr}");
    assert!(stdout.contains("Configuration check passed"));
    assert!(stdout.contains("To buy"));
}

#[test]
fn test_cli_check_rejects_unknown_module_keys() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(
        temp_dir.path(),
        r#"
modules:
  recipes:
    page_size_typo: 10
"#,
    );

    let output = run_foodgram_server(&["--config", &config, "check"]);

    assert!(!output.status.success(), "Unknown module keys should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("recipes"), "{stderr}");
}

#[test]
fn test_cli_invalid_logging_section() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("invalid.yaml");
    std::fs::write(
        &config_path,
        r#"
database:
  url: "sqlite:///tmp/test.db"

logging:
  level: "info"
"#,
    )
    .expect("Failed to write config file");

    let output = run_foodgram_server(&["--config", config_path.to_str().unwrap(), "run"]);

    assert!(!output.status.success(), "Should fail with malformed logging");
}

#[test]
fn test_cli_print_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(temp_dir.path(), "");

    let output = run_foodgram_server(&["--config", &config, "--port", "9123", "--print-config"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("port: 9123"), "{stdout}");
}

#[test]
fn test_cli_migrate_and_load_catalogue() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(temp_dir.path(), "");

    let output = run_foodgram_server(&["--config", &config, "migrate"]);
    assert!(
        output.status.success(),
        "STDERR: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(temp_dir.path().join("home/database/foodgram.db").exists());

    let csv = temp_dir.path().join("ingredients.csv");
    std::fs::write(&csv, "name,measurement_unit\nflour,g\nmilk,ml\n").unwrap();
    let output =
        run_foodgram_server(&["--config", &config, "load-ingredients", csv.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Loaded 2 new ingredients"), "{stdout}");

    // second run is a no-op against the same database file
    let output =
        run_foodgram_server(&["--config", &config, "load-ingredients", csv.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Loaded 0 new ingredients"), "{stdout}");

    let tags = temp_dir.path().join("tags.json");
    std::fs::write(
        &tags,
        r##"[{"name": "Breakfast", "color": "#E26C2D", "slug": "breakfast"}]"##,
    )
    .unwrap();
    let output = run_foodgram_server(&["--config", &config, "load-tags", tags.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Loaded 1 new tags"), "{stdout}");
}

#[test]
fn test_cli_load_rejects_unknown_file_type() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(temp_dir.path(), "");
    let txt = temp_dir.path().join("ingredients.txt");
    std::fs::write(&txt, "flour").unwrap();

    let output = run_foodgram_server(&[
        "--config",
        &config,
        "--mock",
        "load-ingredients",
        txt.to_str().unwrap(),
    ]);

    assert!(!output.status.success());
}

#[tokio::test]
async fn test_cli_run_command_with_mock_database() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(temp_dir.path(), "");

    let result = run_foodgram_server_with_timeout(
        &["--config", &config, "--mock", "run"],
        Duration::from_secs(5),
    )
    .await;

    // Server should start and time out (which means it was running)
    match result {
        Err(err) => assert!(
            err.to_string().contains("elapsed"),
            "Server failed to start: {err}"
        ),
        Ok(output) => panic!(
            "Server exited early: {}",
            String::from_utf8_lossy(&output.stderr)
        ),
    }
}

#[test]
fn test_cli_subcommand_help() {
    let output = run_foodgram_server(&["load-ingredients", "--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("CSV") && stdout.contains("<FILE>"), "{stdout}");
}
