//! End-to-end session tests: exec, the JSONL artifact, and replay.

use std::fs;

use predicates::prelude::*;

mod util;
use util::{autorepro, read_jsonl, workspace};

#[test]
fn until_success_stops_after_first_zero()
{
    let tmp = workspace();
    let jsonl = tmp.path().join("out/runs.jsonl");
    let summary = tmp.path().join("summary.json");

    autorepro(&tmp)
        .args(["exec", "--desc", "flaky failure", "--all", "--until-success", "--jsonl"])
        .arg(&jsonl)
        .arg("--summary")
        .arg(&summary)
        .assert()
        .success();

    let lines = read_jsonl(&jsonl);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["type"], "run");
    assert_eq!(lines[0]["index"], 0);
    assert_eq!(lines[0]["exit_code"], 3);
    assert_eq!(lines[1]["cmd"], "true");
    assert_eq!(lines[1]["exit_code"], 0);
    assert_eq!(lines[2]["type"], "summary");
    assert_eq!(lines[2]["runs"], 2);
    assert_eq!(lines[2]["successes"], 1);
    assert_eq!(lines[2]["first_success_index"], 1);

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary).unwrap()).unwrap();
    assert_eq!(written, lines[2]);
}

#[test]
fn bad_indexes_fail_before_anything_runs()
{
    let tmp = workspace();
    let jsonl = tmp.path().join("runs.jsonl");

    autorepro(&tmp)
        .args(["exec", "--desc", "flaky failure", "--indexes", "2-1", "--jsonl"])
        .arg(&jsonl)
        .assert()
        .code(2);
    assert!(!jsonl.exists());
}

#[test]
fn index_equal_to_length_is_out_of_range()
{
    let tmp = workspace();
    autorepro(&tmp)
        .args(["exec", "--desc", "flaky failure", "--index", "3"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn zero_timeout_is_a_usage_error()
{
    let tmp = workspace();
    autorepro(&tmp)
        .args(["exec", "--desc", "flaky failure", "--timeout", "0"])
        .assert()
        .code(2);
}

#[test]
fn lone_timeout_exits_124()
{
    let tmp = workspace();
    let jsonl = tmp.path().join("runs.jsonl");

    autorepro(&tmp)
        .args(["exec", "--desc", "it seems to hang", "--timeout", "1", "--jsonl"])
        .arg(&jsonl)
        .assert()
        .code(124);

    let lines = read_jsonl(&jsonl);
    assert_eq!(lines[0]["exit_code"], 124);
    assert_eq!(lines[0]["timed_out"], true);
}

#[test]
fn lone_missing_binary_exits_127()
{
    let tmp = workspace();
    autorepro(&tmp)
        .args(["exec", "--desc", "ghost process"])
        .assert()
        .code(127);
}

#[test]
fn dry_run_spawns_nothing()
{
    let tmp = workspace();
    let jsonl = tmp.path().join("runs.jsonl");

    autorepro(&tmp)
        .args(["--dry-run", "exec", "--desc", "flaky failure", "--all", "--jsonl"])
        .arg(&jsonl)
        .assert()
        .success()
        .stdout(predicate::str::contains("[2] echo never"));
    assert!(!jsonl.exists());
}

#[test]
fn env_reaches_the_command()
{
    let tmp = workspace();
    fs::write(
        tmp.path().join("rules.toml"),
        "[[rules]]\necosystem = \"shell\"\ncmd = \"sh -c 'test \\\"$AR_MODE\\\" = ok'\"\nkeywords = [\"flaky\"]\n",
    )
    .unwrap();

    autorepro(&tmp)
        .args(["exec", "--desc", "flaky", "--env", "AR_MODE=ok"])
        .assert()
        .success();
    autorepro(&tmp)
        .args(["exec", "--desc", "flaky", "--env", "AR_MODE=nope"])
        .assert()
        .code(1);
}

#[test]
fn log_dir_keeps_full_output()
{
    let tmp = workspace();
    let jsonl = tmp.path().join("runs.jsonl");
    let logs = tmp.path().join("logs");

    autorepro(&tmp)
        .args(["exec", "--desc", "flaky failure", "--index", "2", "--jsonl"])
        .arg(&jsonl)
        .arg("--log-dir")
        .arg(&logs)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(logs.join("run_000_cmd_2.stdout.log")).unwrap(), "never\n");
    let lines = read_jsonl(&jsonl);
    assert_eq!(lines[0]["stdout_preview"], "never\n");
    assert!(lines[0]["stdout_path"].as_str().unwrap().ends_with("run_000_cmd_2.stdout.log"));
}

#[test]
fn replay_reproduces_recorded_exit_codes()
{
    let tmp = workspace();
    let recorded = tmp.path().join("runs.jsonl");
    let replayed = tmp.path().join("replay.jsonl");

    autorepro(&tmp)
        .args(["exec", "--desc", "flaky failure", "--indexes", "0-1", "--jsonl"])
        .arg(&recorded)
        .assert()
        .success();

    autorepro(&tmp)
        .args(["replay", "--from"])
        .arg(&recorded)
        .arg("--jsonl")
        .arg(&replayed)
        .assert()
        .success();

    let lines = read_jsonl(&replayed);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["exit_code_original"], 3);
    assert_eq!(lines[0]["exit_code_replay"], 3);
    assert_eq!(lines[0]["matched"], true);
    assert_eq!(lines[1]["matched"], true);

    let summary = &lines[2];
    assert_eq!(summary["mode"], "replay");
    assert_eq!(summary["matches"], 2);
    assert_eq!(summary["mismatches"], 0);
    assert_eq!(summary["failures"], 1);
}

#[test]
fn replay_selects_by_recorded_index()
{
    let tmp = workspace();
    let recorded = tmp.path().join("runs.jsonl");
    let replayed = tmp.path().join("replay.jsonl");

    autorepro(&tmp)
        .args(["exec", "--desc", "flaky failure", "--indexes", "0,2", "--jsonl"])
        .arg(&recorded)
        .assert()
        .code(0);

    autorepro(&tmp)
        .args(["replay", "--indexes", "2", "--from"])
        .arg(&recorded)
        .arg("--jsonl")
        .arg(&replayed)
        .assert()
        .success();

    let lines = read_jsonl(&replayed);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["index"], 2);
    assert_eq!(lines[0]["cmd"], "echo never");
}

#[test]
fn replay_without_run_records_fails()
{
    let tmp = workspace();
    let artifact = tmp.path().join("empty.jsonl");
    fs::write(&artifact, "{\"type\":\"summary\",\"runs\":0,\"successes\":0}\n").unwrap();

    autorepro(&tmp)
        .args(["replay", "--from"])
        .arg(&artifact)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no run records"));
}

#[test]
fn replay_honours_until_success()
{
    let tmp = workspace();
    let recorded = tmp.path().join("runs.jsonl");
    let replayed = tmp.path().join("replay.jsonl");

    autorepro(&tmp)
        .args(["exec", "--desc", "flaky failure", "--all", "--jsonl"])
        .arg(&recorded)
        .assert()
        .success();
    let codes: Vec<i64> = read_jsonl(&recorded)
        .iter()
        .filter(|l| l["type"] == "run")
        .map(|l| l["exit_code"].as_i64().unwrap())
        .collect();
    assert_eq!(codes, vec![3, 0, 0]);

    autorepro(&tmp)
        .args(["replay", "--until-success", "--from"])
        .arg(&recorded)
        .arg("--jsonl")
        .arg(&replayed)
        .assert()
        .success();

    let lines = read_jsonl(&replayed);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["index"], 0);
    assert_eq!(lines[1]["index"], 1);
    assert_eq!(lines[2]["type"], "summary");
    assert_eq!(lines[2]["runs"], 2);
    assert_eq!(lines[2]["first_success_index"], 1);
    assert_eq!(lines[2]["matches"], 2);
}

#[test]
fn huge_index_range_is_out_of_range()
{
    let tmp = workspace();
    let jsonl = tmp.path().join("runs.jsonl");

    autorepro(&tmp)
        .timeout(std::time::Duration::from_secs(20))
        .args(["exec", "--desc", "flaky failure", "--indexes", "0-18446744073709551615", "--jsonl"])
        .arg(&jsonl)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("index 3 is out of range"));
    assert!(!jsonl.exists());
}

#[test]
fn replay_intersects_huge_ranges_with_recorded_indices()
{
    let tmp = workspace();
    let recorded = tmp.path().join("runs.jsonl");
    let replayed = tmp.path().join("replay.jsonl");

    autorepro(&tmp)
        .args(["exec", "--desc", "flaky failure", "--indexes", "0,2", "--jsonl"])
        .arg(&recorded)
        .assert()
        .success();

    autorepro(&tmp)
        .timeout(std::time::Duration::from_secs(20))
        .args(["replay", "--indexes", "1-400000000", "--from"])
        .arg(&recorded)
        .arg("--jsonl")
        .arg(&replayed)
        .assert()
        .success();

    let lines = read_jsonl(&replayed);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["index"], 2);
}

#[test]
fn missing_repo_fails_before_spawning()
{
    let tmp = workspace();
    let jsonl = tmp.path().join("runs.jsonl");

    autorepro(&tmp)
        .args(["exec", "--desc", "flaky failure", "--repo", "no-such-dir", "--jsonl"])
        .arg(&jsonl)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not a directory"));
    assert!(!jsonl.exists());

    fs::write(&jsonl, "{\"type\":\"run\",\"index\":0,\"cmd\":\"true\",\"exit_code\":0}\n").unwrap();
    autorepro(&tmp)
        .args(["replay", "--repo", "no-such-dir", "--from"])
        .arg(&jsonl)
        .assert()
        .code(2);
}
