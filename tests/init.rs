use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_sift"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "sift init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config_path = dir.path().join(".sift.toml");
    assert!(config_path.exists(), ".sift.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[llm]"));
    assert!(content.contains("[search]"));

    // Every option is commented out, so the defaults must survive parsing
    let config: sift_core::SiftConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.llm.provider, "openai");
    assert!(config.search.check_offsets);
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".sift.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_sift"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let content = std::fs::read_to_string(dir.path().join(".sift.toml")).unwrap();
    assert_eq!(content, "# existing");
}
