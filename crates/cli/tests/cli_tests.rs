//! CLI integration tests

use std::process::Command;

fn fsx_tiering(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "fsx-tiering-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help with every required flag
#[test]
fn test_cli_help() {
    let output = fsx_tiering(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("S3 Intelligent-Tiering"), "Should describe the tool");
    for flag in ["--fsx-id", "--volume-id", "--region", "--profile"] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
    assert!(stdout.contains("--config"), "Should show config option");
    assert!(stdout.contains("--metrics-file"), "Should show metrics-file option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = fsx_tiering(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("fsx-tiering"), "Should show binary name");
}

/// A missing required flag is a usage error before any AWS call
#[test]
fn test_missing_volume_id_is_usage_error() {
    let output = fsx_tiering(&[
        "--fsx-id",
        "fs-0123456789abcdef0",
        "--region",
        "us-east-1",
        "--profile",
        "default",
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2), "Usage errors exit with 2");
    assert!(stderr.contains("--volume-id"), "Should name the missing flag");
}

/// No flags at all lists every missing required flag
#[test]
fn test_no_arguments_lists_required_flags() {
    let output = fsx_tiering(&[]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    for flag in ["--fsx-id", "--volume-id", "--region", "--profile"] {
        assert!(stderr.contains(flag), "Should name {}", flag);
    }
}

/// An empty identifier is rejected by the parser
#[test]
fn test_empty_fsx_id_rejected() {
    let output = fsx_tiering(&[
        "--fsx-id",
        "",
        "--volume-id",
        "fsvol-0123456789abcdef0",
        "--region",
        "us-east-1",
        "--profile",
        "default",
    ]);

    assert_eq!(output.status.code(), Some(2));
}

/// Unknown output formats are rejected
#[test]
fn test_invalid_format_rejected() {
    let output = fsx_tiering(&[
        "--fsx-id",
        "fs-0123456789abcdef0",
        "--volume-id",
        "fsvol-0123456789abcdef0",
        "--region",
        "us-east-1",
        "--profile",
        "default",
        "--format",
        "yaml",
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("yaml"), "Should echo the rejected value");
}

/// An invalid configuration file fails before contacting AWS
#[test]
fn test_invalid_config_fails_with_hint() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[tiering]\naccess_ratio_frequent_threshold = 0.1\naccess_ratio_infrequent_threshold = 0.5\n",
    )
    .unwrap();

    let output = fsx_tiering(&[
        "--fsx-id",
        "fs-0123456789abcdef0",
        "--volume-id",
        "fsvol-0123456789abcdef0",
        "--region",
        "us-east-1",
        "--profile",
        "default",
        "--config",
        path.to_str().unwrap(),
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("invalid configuration"));
    assert!(stderr.contains("hint:"));
}
