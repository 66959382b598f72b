//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Path of the `stint` binary built for this test run
pub fn stint_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_stint"))
}

/// Run the stint binary in `dir` with colors off and no ambient user
pub fn run_stint_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(stint_binary())
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("STINT_USER")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute stint binary")
}

/// Run stint as `user`, asserting success, and parse its `--json` output
pub fn run_json(dir: &Path, user: &str, args: &[&str]) -> serde_json::Value {
    let mut full = vec!["--json", "--as", user];
    full.extend_from_slice(args);
    let output = run_stint_in_dir(dir, &full);
    assert!(
        output.status.success(),
        "stint {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

/// Create a project owned by `owner` and return its id
pub fn create_project(dir: &Path, owner: &str, args: &[&str]) -> String {
    let mut full = vec!["project", "create"];
    full.extend_from_slice(args);
    let project = run_json(dir, owner, &full);
    project["id"].as_str().expect("project id").to_string()
}

/// Create an issue and return its id
pub fn create_issue(dir: &Path, user: &str, project: &str, title: &str, extra: &[&str]) -> String {
    let mut full = vec!["issue", "create", "-P", project, "--title", title];
    full.extend_from_slice(extra);
    let issue = run_json(dir, user, &full);
    issue["id"].as_str().expect("issue id").to_string()
}
