use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn run_sift(dir: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_sift"))
        .args(args)
        .current_dir(dir)
        .env_remove("OPENAI_API_KEY")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    // sift may exit before reading stdin, so a broken pipe is not a failure
    let _ = child.stdin.take().unwrap().write_all(stdin.as_bytes());
    child.wait_with_output().unwrap()
}

#[test]
fn empty_stdin_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_sift(dir.path(), &["refund policy"], "  \n\t ");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no input provided"));
}

#[test]
fn json_format_reports_errors_as_object() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_sift(dir.path(), &["refund policy", "--format", "json"], "");

    assert_eq!(output.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["error"], "no input provided via stdin");
}

#[test]
fn missing_api_key_explains_how_to_set_it() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_sift(dir.path(), &["refund policy"], "Refunds within 30 days.");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No API key"), "stderr: {stderr}");
    assert!(stderr.contains("OPENAI_API_KEY"), "stderr: {stderr}");
}

#[test]
fn unreachable_backend_fails_without_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".sift.toml"),
        "[llm]\nprovider = \"ollama\"\nbase_url = \"http://127.0.0.1:9\"\ntimeout_secs = 5\n",
    )
    .unwrap();

    let output = run_sift(
        dir.path(),
        &["refund policy", "--format", "json"],
        "Refunds within 30 days.",
    );

    assert_eq!(output.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let message = value["error"].as_str().unwrap();
    assert!(message.contains("backend"), "error: {message}");
    assert!(value.get("matches").is_none());
}

#[test]
fn explicit_config_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_sift(
        dir.path(),
        &["refund policy", "--config", "missing.toml"],
        "Refunds within 30 days.",
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing.toml"));
}

#[test]
fn config_errors_are_json_objects_in_json_format() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_sift(
        dir.path(),
        &["refund policy", "--config", "missing.toml", "--format", "json"],
        "Refunds within 30 days.",
    );

    assert_eq!(output.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let message = value["error"].as_str().unwrap();
    assert!(message.contains("file not found"), "error: {message}");
    assert!(message.contains("missing.toml"), "error: {message}");
}

#[test]
fn invalid_config_values_are_json_objects_in_json_format() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".sift.toml"),
        "[search]\nscore_tolerance = -1.0\n",
    )
    .unwrap();

    let output = run_sift(
        dir.path(),
        &["refund policy", "--format", "json"],
        "Refunds within 30 days.",
    );

    assert_eq!(output.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value["error"]
        .as_str()
        .unwrap()
        .contains("score_tolerance"));
}
