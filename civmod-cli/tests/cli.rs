use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use assert_cmd::cargo::{self};
use predicates::prelude::*;
use predicates::str::contains;

fn temp_path(ext: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("civmod-cli-{nanos}.{ext}"))
}

#[test]
fn prints_help() {
    let mut cmd = cargo::cargo_bin_cmd!("civmod");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(contains("civmod"));
}

#[test]
fn edit_help_lists_script_commands() {
    let mut cmd = cargo::cargo_bin_cmd!("civmod");
    cmd.args(["edit", "--help"])
        .assert()
        .success()
        .stdout(contains("append PATH VALUE").and(contains("finish")));
}

#[test]
fn inline_commands_build_a_document() {
    let mut cmd = cargo::cargo_bin_cmd!("civmod");
    cmd.args([
        "edit",
        "--no-pretty",
        "-e",
        "set units.0.id u1",
        "-e",
        "set units.0.unit_type UNIT_X",
    ])
    .assert()
    .success()
    .stdout(contains(r#"{"units":[{"id":"u1","unit_type":"UNIT_X"}]}"#));
}

#[test]
fn blocked_finish_reports_line_and_missing_fields() {
    let script = "\
set metadata.name \"Rome Mod\"
wizard
next
next
next
next
# only metadata.id is missing from a complete wizard
finish
";
    let mut cmd = cargo::cargo_bin_cmd!("civmod");
    cmd.args(["edit", "--script", "-"])
        .write_stdin(script)
        .assert()
        .failure()
        .stderr(contains("line 8").and(contains("Mod ID is required")));
}

#[test]
fn wizard_flow_merges_into_written_file() {
    let input = r#"{"civilization": {"bindings": ["unit_a"]}, "constants": {"speed": 2}}"#;
    let script = "\
wizard
set metadata.id rome-mod
set metadata.name \"Rome Mod\"
set metadata.package rome
set action_group.age AGE_ANTIQUITY
next
set civilization.civilization_type CIVILIZATION_ROME
set civilization.name Rome
next
append civilization.traits TRAIT_ROME
next
append modifiers {\"id\": \"MOD_X\"}
next
finish
";
    let script_path = temp_path("txt");
    fs::write(&script_path, script).unwrap();
    let output = temp_path("json");

    let mut cmd = cargo::cargo_bin_cmd!("civmod");
    cmd.args(["edit", "--input", input, "--script"])
        .arg(&script_path)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["metadata"]["id"], "rome-mod");
    assert_eq!(written["constants"]["speed"], 2);
    assert_eq!(
        written["civilization"]["bindings"],
        serde_json::json!(["unit_a", "MOD_X"])
    );
    let _ = fs::remove_file(script_path);
    let _ = fs::remove_file(output);
}

#[test]
fn refuses_to_overwrite_without_force() {
    let output = temp_path("json");
    fs::write(&output, "{}").unwrap();
    let mut cmd = cargo::cargo_bin_cmd!("civmod");
    cmd.args(["edit", "-e", "set metadata.id m", "-o"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(contains("--force"));
    let _ = fs::remove_file(output);
}

#[test]
fn catalog_rejects_unknown_data_types() {
    let mut cmd = cargo::cargo_bin_cmd!("civmod");
    cmd.args(["catalog", "dragons"])
        .assert()
        .failure()
        .stderr(contains("yield-types"));
}

#[test]
fn unreachable_catalog_prints_nothing() {
    let mut cmd = cargo::cargo_bin_cmd!("civmod");
    cmd.args(["catalog", "ages", "--catalog-url", "http://127.0.0.1:9"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
