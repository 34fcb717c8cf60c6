//! End-to-end checks for `autorepro suggest`.

use predicates::prelude::*;
use serde_json::Value;

mod util;
use util::{autorepro, workspace};

#[test]
fn pytest_issue_ranks_pytest_first()
{
    let tmp = workspace();
    let out = autorepro(&tmp)
        .args(["suggest", "--desc", "pytest is failing on CI", "--lang", "python", "--json"])
        .output()
        .expect("run");
    assert!(out.status.success());

    let v: Value = serde_json::from_slice(&out.stdout).expect("json");
    let top = &v["suggestions"][0];
    assert_eq!(top["cmd"], "pytest -q");
    assert!(top["score"].as_i64().unwrap() >= 6);
    let rationale = top["rationale"].as_str().unwrap();
    assert!(rationale.contains("matched keywords: pytest"));
    assert!(rationale.contains("detected langs: python"));
    assert_eq!(v["min_score"], 2);
}

#[test]
fn languages_come_from_marker_files()
{
    let tmp = workspace();
    std::fs::write(tmp.path().join("go.mod"), "module example.com/x\n").unwrap();
    let out = autorepro(&tmp)
        .args(["suggest", "--desc", "something broke", "--json"])
        .output()
        .expect("run");
    let v: Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(v["detected_langs"], serde_json::json!(["go"]));
    assert_eq!(v["suggestions"][0]["ecosystem"], "go");
}

#[test]
fn empty_description_yields_empty_list()
{
    let tmp = workspace();
    autorepro(&tmp)
        .args(["suggest", "--desc", "", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""suggestions":[]"#));
}

#[test]
fn strict_mode_fails_without_candidates()
{
    let tmp = workspace();
    autorepro(&tmp)
        .args(["suggest", "--desc", "nothing relevant here", "--strict"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no candidate commands"));
}

#[test]
fn plugin_rules_rank_by_command_on_ties()
{
    let tmp = workspace();
    let out = autorepro(&tmp)
        .args(["suggest", "--desc", "flaky failure", "--json", "--limit", "2"])
        .output()
        .expect("run");
    let v: Value = serde_json::from_slice(&out.stdout).expect("json");
    let cmds: Vec<&str> = v["suggestions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["cmd"].as_str().unwrap())
        .collect();
    assert_eq!(cmds, vec!["sh -c 'exit 3'", "true"]);
    assert_eq!(v["suggestions"][0]["source"], "plugin");
}

#[test]
fn table_output_lists_commands()
{
    let tmp = workspace();
    autorepro(&tmp)
        .args(["--no-color", "suggest", "--desc", "flaky failure"])
        .assert()
        .success()
        .stdout(predicate::str::contains("echo never"))
        .stdout(predicate::str::contains("rationale"));
}

#[test]
fn missing_issue_text_is_a_usage_error()
{
    let tmp = workspace();
    autorepro(&tmp)
        .args(["suggest"])
        .assert()
        .code(2);
}

#[test]
fn broken_rule_file_is_reported_only_with_debug_flag()
{
    let tmp = workspace();
    std::fs::write(tmp.path().join("rules.toml"), "[[rules]]\nthis is not toml\n").unwrap();

    autorepro(&tmp)
        .args(["suggest", "--desc", "pytest fails", "--json"])
        .env_remove("AUTOREPRO_PLUGINS_DEBUG")
        .assert()
        .success()
        .stderr(predicate::str::contains("failed to load plugin").not());

    autorepro(&tmp)
        .args(["suggest", "--desc", "pytest fails", "--json"])
        .env("AUTOREPRO_PLUGINS_DEBUG", "1")
        .assert()
        .success()
        .stderr(predicate::str::contains("failed to load plugin"));
}
