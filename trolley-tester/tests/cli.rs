use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "trolley-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_trolley-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("animation-restart"));
}

#[test]
fn cli_runs_logic_catalog_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_trolley-tester");
    let output_path = temp_path("run");
    let output = Command::new(exe)
        .args([
            "--mode",
            "logic",
            "--report",
            "json",
            "--scenarios",
            "all",
            "--iterations",
            "2",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Trolley Simulator Tester"));

    let content = std::fs::read_to_string(output_path).expect("read output");
    let json_part = content.split("🏁").next().unwrap_or_default();
    let parsed: serde_json::Value = serde_json::from_str(json_part).expect("json report");
    let results = parsed.as_array().expect("array of results");
    assert!(results.len() >= 10);
    assert!(results.iter().all(|r| r["passed"] == true));
}

#[test]
fn cli_fails_when_service_is_unreachable() {
    let exe = env!("CARGO_BIN_EXE_trolley-tester");
    let output_path = temp_path("service");
    let output = Command::new(exe)
        .args([
            "--mode",
            "service",
            "--service-url",
            "http://127.0.0.1:9",
            "--timeout-secs",
            "1",
            "--iterations",
            "1",
            "--report",
            "markdown",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Service Smoke Test"));
}

#[test]
fn cli_rejects_invalid_config_file() {
    let exe = env!("CARGO_BIN_EXE_trolley-tester");
    let config_path = temp_path("config");
    std::fs::write(&config_path, r#"{"history_capacity": 0}"#).expect("write config");
    let output = Command::new(exe)
        .args(["--scenarios", "smoke", "--iterations", "1", "--config"])
        .arg(&config_path)
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("history_capacity"));
}

#[test]
fn cli_rejects_unknown_report_format() {
    let exe = env!("CARGO_BIN_EXE_trolley-tester");
    let output = Command::new(exe)
        .args(["--report", "csv", "--iterations", "1"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("csv"));
}
