//! Integration tests for the `evidence-pack` binary

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};

use super::common::fixtures::{full_capture, TestBaseDir, TEST_PNG_BASE64};
use evidence_pack::pack::write_evidence_pack;

/// Command with config and logs isolated in `home`
fn cli(home: &TestBaseDir) -> Command {
    let mut cmd = Command::cargo_bin("evidence-pack").expect("binary should build");
    cmd.env("EVIDENCE_PACK_HOME", &home.path)
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_write_from_manifest_then_inspect() {
    let home = TestBaseDir::new();
    let packs = TestBaseDir::new();
    let manifest = home.path.join("capture.json");
    std::fs::write(
        &manifest,
        json!({
            "metadata": { "runId": "cli-run", "url": "https://cli.example/" },
            "network": "raw proxy log",
            "dom": { "initial": "<html></html>" },
            "screenshots": { "full": TEST_PNG_BASE64 },
            "iframes": [ { "id": "f1", "isAd": true } ]
        })
        .to_string(),
    )
    .unwrap();

    let output = cli(&home)
        .arg("write")
        .arg(&manifest)
        .arg("--base-dir")
        .arg(&packs.path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let printed: Value = serde_json::from_slice(&output.stdout).unwrap();
    let root = packs.path.join("cli-run");
    assert_eq!(printed["root"], json!(root.to_string_lossy()));
    assert_eq!(std::fs::read(root.join("screenshots/full.png")).unwrap(), b"PNGDATA");

    cli(&home)
        .arg("inspect")
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("run:         cli-run"))
        .stdout(predicate::str::contains("raw text (13 bytes)"))
        .stdout(predicate::str::contains("iframes:     1 (1 flagged ad)"))
        .stdout(predicate::str::contains("tags:        absent"));
}

#[test]
fn test_inspect_json_prints_canonical_record() {
    let home = TestBaseDir::new();
    let packs = TestBaseDir::new();
    let paths = write_evidence_pack(&packs.path, &full_capture("json-run")).unwrap();

    let output = cli(&home)
        .arg("inspect")
        .arg(&paths.root)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let printed: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(printed["metadata"]["runId"], json!("json-run"));
    assert_eq!(printed["gptEvents"][1]["size"], json!([728, 90]));
    assert_eq!(printed["iframes"][2], json!({
        "id": "sticky",
        "bbox": { "x": 0.0, "y": 0.0, "width": 0.0, "height": 0.0 },
        "areaPctOfViewport": 0.0
    }));
}

#[test]
fn test_inspect_missing_pack_fails() {
    let home = TestBaseDir::new();

    cli(&home)
        .arg("inspect")
        .arg(home.path.join("nothing-here"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no evidence pack at"));
}

#[test]
fn test_list_and_paths_use_base_dir() {
    let home = TestBaseDir::new();
    let packs = TestBaseDir::new();
    write_evidence_pack(&packs.path, &full_capture("b")).unwrap();
    write_evidence_pack(&packs.path, &full_capture("a")).unwrap();

    cli(&home)
        .arg("list")
        .arg("--base-dir")
        .arg(&packs.path)
        .assert()
        .success()
        .stdout("a\nb\n");

    let output = cli(&home)
        .args(["paths", "run-7", "--base-dir"])
        .arg(&packs.path)
        .output()
        .unwrap();
    let printed: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        printed["gptEvents"],
        json!(packs.path.join("run-7").join("gpt_events.json").to_string_lossy())
    );
}

#[test]
fn test_normalize_legacy_file() {
    let home = TestBaseDir::new();
    let file = home.path.join("old_iframes.json");
    std::fs::write(
        &file,
        r#"{ "frames": [ { "boundingBox": { "w": 300, "h": 250 }, "adFlag": true } ] }"#,
    )
    .unwrap();

    let output = cli(&home)
        .args(["normalize", "--kind", "iframes"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());

    let printed: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(printed[0]["id"], json!("frame-0"));
    assert_eq!(printed[0]["bbox"]["width"], json!(300.0));
    assert_eq!(printed[0]["isAd"], json!(true));
}

#[test]
fn test_first_run_writes_example_config() {
    let home = TestBaseDir::new();
    let packs = TestBaseDir::new();

    cli(&home)
        .arg("list")
        .arg("--base-dir")
        .arg(&packs.path)
        .assert()
        .success();

    assert!(home.path.join("config.toml").is_file());
    assert!(home.path.join("logs").join("evidence-pack.log").is_file());
}
