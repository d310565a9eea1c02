//! Integration tests for the `tuneup export` command.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

const PROJECT: &str = r#"
[functions.extract.variants.baseline]
system_template = "functions/extract/system.minijinja"

[metrics.accuracy]
type = "float"
optimize = "max"

[export]
function_name = "extract"
metric_name = "accuracy"
template_variant = "baseline"
threshold = 0.5
val_fraction = 0.25
"#;

fn write_fixture(dir: &Path) {
    std::fs::write(dir.join("tuneup.toml"), PROJECT).unwrap();

    let mut lines = Vec::new();
    for ep in 0..8 {
        lines.push(
            json!({
                "function_name": "extract",
                "variant_name": "baseline",
                "episode_id": format!("ep-{ep}"),
                "system": "Extract the entities.",
                "messages": [
                    {"role": "user", "content": [{"type": "text", "text": format!("question {ep}")}]}
                ],
                "output": [{"type": "text", "text": format!("answer {ep}")}],
                "feedback": {"accuracy": if ep < 4 { 0.9 } else { 0.2 }}
            })
            .to_string(),
        );
    }
    // Tool call with arguments that are not a JSON object; counted as failed.
    lines.push(
        json!({
            "function_name": "extract",
            "variant_name": "baseline",
            "episode_id": "ep-bad",
            "output": [{"type": "tool_call", "name": "lookup", "arguments": "not json"}],
            "feedback": {"accuracy": 1.0}
        })
        .to_string(),
    );
    std::fs::write(dir.join("inferences.jsonl"), lines.join("\n")).unwrap();
}

fn tuneup(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tuneup").unwrap();
    cmd.current_dir(dir.path()).env("HOME", dir.path()).env_remove("TUNEUP_GATEWAY_URL");
    cmd
}

#[test]
fn test_export_writes_split_and_manifest() {
    let temp_dir = TempDir::new().unwrap();
    write_fixture(temp_dir.path());

    let assert = tuneup(&temp_dir)
        .args(["export", "--input", "inferences.jsonl", "--output-dir", "out", "--json"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let manifest: serde_json::Value = serde_json::from_str(&stdout).expect("export --json should print the manifest");

    assert_eq!(manifest["counts"]["fetched"], 5);
    assert_eq!(manifest["counts"]["converted"], 4);
    assert_eq!(manifest["counts"]["failed"], 1);
    assert_eq!(manifest["train"]["episodes"], 3);
    assert_eq!(manifest["validation"]["episodes"], 1);

    let run_dir = temp_dir.path().join("out").join(manifest["run_id"].as_str().unwrap());
    let train = std::fs::read_to_string(run_dir.join("train.jsonl")).unwrap();
    assert_eq!(train.lines().count(), 3);
    let row: serde_json::Value = serde_json::from_str(train.lines().next().unwrap()).unwrap();
    assert!(row["contents"].is_array());
    assert_eq!(row["systemInstruction"]["parts"][0]["text"], "Extract the entities.");
    assert!(run_dir.join("validation.jsonl").exists());
    assert!(run_dir.join("manifest.json").exists());
}

#[test]
fn test_export_human_output() {
    let temp_dir = TempDir::new().unwrap();
    write_fixture(temp_dir.path());

    tuneup(&temp_dir)
        .args(["export", "--input", "inferences.jsonl", "--output-dir", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Export complete"))
        .stdout(predicate::str::contains("4 converted"));
}

#[test]
fn test_export_same_seed_same_split() {
    let temp_dir = TempDir::new().unwrap();
    write_fixture(temp_dir.path());

    let run = |out: &str| {
        let assert = tuneup(&temp_dir)
            .args(["export", "--input", "inferences.jsonl", "--seed", "7", "--output-dir", out, "--json"])
            .assert()
            .success();
        let manifest: serde_json::Value =
            serde_json::from_slice(&assert.get_output().stdout).unwrap();
        manifest["train"]["dataset_id"].clone()
    };

    assert_eq!(run("a"), run("b"));
}

#[test]
fn test_export_missing_project_config() {
    let temp_dir = TempDir::new().unwrap();

    tuneup(&temp_dir)
        .args(["export", "--input", "inferences.jsonl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tuneup.toml"));
}

#[test]
fn test_export_unknown_metric_fails_before_reading_data() {
    let temp_dir = TempDir::new().unwrap();
    write_fixture(temp_dir.path());

    tuneup(&temp_dir)
        .args(["export", "--input", "missing.jsonl", "--metric", "latency"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown metric: latency"));
}

#[test]
fn test_export_rejects_out_of_range_val_fraction() {
    let temp_dir = TempDir::new().unwrap();
    write_fixture(temp_dir.path());

    tuneup(&temp_dir)
        .args(["export", "--input", "inferences.jsonl", "--val-fraction", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("val_fraction"));
}

#[test]
fn test_export_with_single_episode_fails() {
    let temp_dir = TempDir::new().unwrap();
    write_fixture(temp_dir.path());

    tuneup(&temp_dir)
        .args(["export", "--input", "inferences.jsonl", "--threshold", "0.95"])
        .assert()
        .failure();
}
