//! Integration tests for the command-line interface
//!
//! Runs the built binary against temporary projects.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to create a project with a freshly generated baml_client
fn setup_test_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let client = dir.path().join("baml_client");
    fs::create_dir_all(&client).unwrap();
    fs::create_dir_all(dir.path().join("baml_src")).unwrap();

    fs::write(
        client.join("globals.py"),
        fs::read_to_string("tests/fixtures/globals.py").unwrap(),
    )
    .unwrap();
    fs::write(
        client.join("__init__.py"),
        fs::read_to_string("tests/fixtures/__init__.py").unwrap(),
    )
    .unwrap();

    dir
}

fn fixer(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_baml-path-fixer"))
        .args(args)
        .current_dir(cwd)
        .env_remove("BAML_PROJECT_DIR")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

#[test]
fn test_apply_help() {
    let dir = TempDir::new().unwrap();
    let output = fixer(dir.path(), &["apply", "--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Patch globals.py and __init__.py"));
}

#[test]
fn test_no_arguments_patches_both_files() {
    let project = setup_test_project();
    let output = fixer(project.path(), &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("🔧 Fixing BAML client paths..."));
    assert!(stdout.contains("Fixed globals.py to use absolute paths"));
    assert!(stdout.contains("Added auto-fix to __init__.py"));
    assert!(stdout.trim_end().ends_with(
        "✅ Done! Your baml_client now always uses the correct project's baml_src directory."
    ));

    let globals = fs::read_to_string(project.path().join("baml_client/globals.py")).unwrap();
    assert!(globals.contains("_baml_src_dir"));
}

#[test]
fn test_apply_idempotent() {
    let project = setup_test_project();

    let _ = fixer(project.path(), &["apply"]);
    let output = fixer(project.path(), &["apply"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("globals.py already uses absolute paths"));
    assert!(stdout.contains("__init__.py already has auto-fix code"));
}

#[test]
fn test_auto_detects_project_from_subdirectory() {
    let project = setup_test_project();
    let nested = project.path().join("app/handlers");
    fs::create_dir_all(&nested).unwrap();

    let output = fixer(&nested, &[]);

    assert!(output.status.success());
    let globals = fs::read_to_string(project.path().join("baml_client/globals.py")).unwrap();
    assert!(globals.contains("_baml_src_dir"));
}

#[test]
fn test_missing_client_still_exits_zero() {
    let dir = TempDir::new().unwrap();
    let output = fixer(dir.path(), &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("globals.py not found"));
    assert!(stdout.contains("__init__.py not found"));
    assert!(stdout.contains("✅ Done!"));
}

#[test]
fn test_apply_dry_run_with_diff() {
    let project = setup_test_project();
    let original = fs::read_to_string(project.path().join("baml_client/globals.py")).unwrap();

    let output = fixer(project.path(), &["apply", "--dry-run", "--diff"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("DRY RUN"));
    assert!(stdout.contains("Would apply: Fixed globals.py to use absolute paths"));
    assert!(stdout.contains("+  str(_baml_src_dir),"));
    assert!(stdout.contains("-  \"baml_src\","));

    let after = fs::read_to_string(project.path().join("baml_client/globals.py")).unwrap();
    assert_eq!(after, original);
}

#[test]
fn test_status_command() {
    let project = setup_test_project();
    let project_arg = project.path().to_str().unwrap();

    let output = fixer(project.path(), &["status", "--project", project_arg]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("BAML Client Patch Status"));
    assert!(stdout.contains("globals.py: NEEDS PATCH"));
    assert!(stdout.contains("__init__.py: NEEDS PATCH"));
}

#[test]
fn test_verify_command() {
    let project = setup_test_project();

    let before = fixer(project.path(), &["verify"]);
    assert!(!before.status.success());

    let _ = fixer(project.path(), &["apply"]);

    let after = fixer(project.path(), &["verify"]);
    assert!(after.status.success());
    let stdout = String::from_utf8_lossy(&after.stdout);
    assert!(stdout.contains("Verifying generated client"));
    assert!(stdout.contains("2 verified"));
}

#[test]
fn test_project_from_environment() {
    let project = setup_test_project();
    let elsewhere = TempDir::new().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_baml-path-fixer"))
        .current_dir(elsewhere.path())
        .env("BAML_PROJECT_DIR", project.path())
        .env("NO_COLOR", "1")
        .output()
        .unwrap();

    assert!(output.status.success());
    let init = fs::read_to_string(project.path().join("baml_client/__init__.py")).unwrap();
    assert!(init.contains("# Auto-fix: Ensure baml_src path"));
}

#[test]
fn test_missing_project_flag() {
    let dir = TempDir::new().unwrap();
    let output = fixer(dir.path(), &["apply", "--project", "/nonexistent/project"]);

    assert!(!output.status.success());
}
