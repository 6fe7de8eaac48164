// driver バイナリのテスト

use crate::fixtures::*;
use std::process::Command;
use tempfile::TempDir;

fn driver() -> Command {
    Command::new(env!("CARGO_BIN_EXE_driver"))
}

#[test]
fn test_cli_help() {
    let output = driver().arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("driver"));
    assert!(stdout.contains("MODE"));
}

#[test]
fn test_cli_converts_folder_and_prints_time() {
    let temp_dir = TempDir::new().unwrap();
    write_png(temp_dir.path(), "a.png", [255, 0, 0]);
    write_png(temp_dir.path(), "b.png", [0, 255, 0]);

    let output = driver()
        .args(["2", "t"])
        .arg(temp_dir.path())
        .arg("--quiet")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Total time:"));
    assert!(stdout.contains("2 succeeded, 0 failed"));
    assert_uniform_gray(&temp_dir.path().join("out_a.png"), 85);
}

#[test]
fn test_cli_writes_json_report() {
    let temp_dir = image_folder(2);
    write_not_png(temp_dir.path(), "bad.png");
    let report = temp_dir.path().join("report.json");

    let output = driver()
        .args(["1", "p"])
        .arg(temp_dir.path())
        .arg("--report")
        .arg(&report)
        .arg("--quiet")
        .output()
        .unwrap();

    // 個別ジョブの失敗ではバッチは成功扱い
    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["strategy"], "process-pool");
    assert_eq!(json["succeeded"], 2);
    assert_eq!(json["failed"], 1);
}

#[test]
fn test_cli_usage_errors() {
    let missing = driver().args(["2", "t"]).output().unwrap();
    let unknown_mode = driver().args(["2", "x", "."]).output().unwrap();
    let bad_number = driver().args(["two", "q", "."]).output().unwrap();

    assert_eq!(missing.status.code(), Some(2));
    assert_eq!(unknown_mode.status.code(), Some(2));
    assert_eq!(bad_number.status.code(), Some(2));
}

#[test]
fn test_cli_unreadable_folder_exits_with_one() {
    let temp_dir = TempDir::new().unwrap();

    let output = driver()
        .args(["2", "q"])
        .arg(temp_dir.path().join("missing"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_cli_zero_concurrency_is_configuration_error() {
    let temp_dir = TempDir::new().unwrap();

    let output = driver().args(["0", "t"]).arg(temp_dir.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
}
