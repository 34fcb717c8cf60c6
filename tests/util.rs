//! Shared test utilities for integration tests
//!
//! Builds throwaway workspaces with a plugin rule file so commands are
//! deterministic regardless of what the host has installed.

#![allow(dead_code)]

use assert_cmd::Command;
use assert_fs::prelude::*;

/// Rules in a plugin-only ecosystem, keyed on "flaky" and "hang".
///
/// Ranking for "flaky": [0] `sh -c 'exit 3'`, [1] `true` (both score 4,
/// cmd ascending), [2] `echo never` (score 3).
pub const RULES: &str = r#"
[[rules]]
ecosystem = "shell"
cmd = "sh -c 'exit 3'"
keywords = ["flaky"]
weight = 2

[[rules]]
ecosystem = "shell"
cmd = "true"
keywords = ["flaky"]
weight = 1

[[rules]]
ecosystem = "shell"
cmd = "echo never"
keywords = ["flaky"]

[[rules]]
ecosystem = "shell"
cmd = "sleep 5"
keywords = ["hang"]
weight = 1

[[rules]]
ecosystem = "shell"
cmd = "autorepro-missing-binary-xyz --flag"
keywords = ["ghost"]
weight = 1
"#;

/// Empty workspace containing `rules.toml`
pub fn workspace() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    tmp.child("rules.toml")
        .write_str(RULES)
        .expect("write rules");
    tmp
}

/// The binary, run inside `tmp` with only that workspace's plugin rules
pub fn autorepro(tmp: &assert_fs::TempDir) -> Command
{
    let mut cmd = Command::cargo_bin("autorepro").expect("bin");
    cmd.current_dir(tmp.path())
        .env("AUTOREPRO_PLUGINS", tmp.path().join("rules.toml"))
        .env_remove("AUTOREPRO_LOG")
        .env_remove("AUTOREPRO__SUGGEST__MIN_SCORE")
        .env_remove("AUTOREPRO__SUGGEST__STRICT")
        .env_remove("AUTOREPRO__EXEC__TIMEOUT_SECS");
    cmd
}

/// Parse every line of a JSONL file
pub fn read_jsonl(path: &std::path::Path) -> Vec<serde_json::Value>
{
    std::fs::read_to_string(path)
        .expect("read jsonl")
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect()
}
