use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_tribunal"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "tribunal init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config_path = dir.path().join(".tribunal.toml");
    assert!(config_path.exists(), ".tribunal.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[llm]"));
    assert!(content.contains("[rate_limit]"));

    // Verify it's valid TOML that tribunal-core can parse
    let _config: tribunal_core::TribunalConfig = toml::from_str(&content).unwrap();
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".tribunal.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_tribunal"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
}

#[test]
fn judges_lists_the_full_panel() {
    let output = Command::new(env!("CARGO_BIN_EXE_tribunal"))
        .args(["judges", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let catalog: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(catalog["judges"].as_array().unwrap().len(), 8);
    assert_eq!(catalog["presets"].as_array().unwrap().len(), 3);
}
