//! Replay of a recorded JSONL session.
//!
//! Only `"type": "run"` lines are considered. Selection works on each
//! record's own `index` field, and the chosen commands go through the same
//! orchestration loop as a live session, with every new record carrying the
//! original exit code alongside the replayed one.

use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::error::ReproError;
use crate::core::selection::Selection;
use crate::core::session::{
    CommandRunner, PlannedCommand, SessionOptions, SessionReport, run_session,
};

/// The fields replay needs from a recorded run line
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecordedRun
{
    pub index: usize,
    pub cmd: String,
    pub exit_code: i32,
}

/// Parse the run records out of a JSONL artifact.
///
/// Missing or unreadable files, lines that are not JSON objects, malformed
/// run lines and files without any run line are all artifact errors.
pub fn load_runs(path: &Path) -> Result<Vec<RecordedRun>, ReproError>
{
    let text = fs::read_to_string(path)
        .map_err(|e| ReproError::artifact(path, format!("cannot read file: {e}")))?;
    parse_runs(path, &text)
}

fn parse_runs(
    path: &Path,
    text: &str,
) -> Result<Vec<RecordedRun>, ReproError>
{
    let mut runs = Vec::new();

    for (lineno, line) in text
        .lines()
        .enumerate()
    {
        let line = line.trim();
        if line.is_empty()
        {
            continue;
        }

        let value: Value = serde_json::from_str(line).map_err(|e| {
            ReproError::artifact(path, format!("line {}: invalid JSON: {e}", lineno + 1))
        })?;

        if value
            .get("type")
            .and_then(Value::as_str)
            != Some("run")
        {
            continue;
        }

        let run: RecordedRun = serde_json::from_value(value).map_err(|e| {
            ReproError::artifact(path, format!("line {}: malformed run record: {e}", lineno + 1))
        })?;
        runs.push(run);
    }

    if runs.is_empty()
    {
        return Err(ReproError::artifact(path, "no run records found"));
    }

    Ok(runs)
}

/// Pick records by their recorded index, ascending; file order breaks ties.
pub fn select_runs(
    path: &Path,
    runs: &[RecordedRun],
    selection: &Selection,
) -> Result<Vec<PlannedCommand>, ReproError>
{
    let mut chosen: Vec<&RecordedRun> = runs
        .iter()
        .filter(|r| match selection
        {
            Selection::All => true,
            Selection::Explicit(ranges) => ranges.contains(r.index),
            Selection::Single(i) => r.index == *i,
        })
        .collect();

    if chosen.is_empty()
    {
        return Err(ReproError::artifact(path, "no run records match the requested indexes"));
    }

    chosen.sort_by_key(|r| r.index);

    Ok(chosen
        .into_iter()
        .map(|r| PlannedCommand {
            index: r.index,
            cmd: r
                .cmd
                .clone(),
            original_exit_code: Some(r.exit_code),
        })
        .collect())
}

/// Load, select and re-execute. All artifact checks happen before the first
/// command is spawned.
#[instrument(skip(selection, opts, runner), fields(path = %path.display()))]
pub fn replay(
    path: &Path,
    selection: &Selection,
    opts: &SessionOptions,
    runner: &mut dyn CommandRunner,
) -> Result<SessionReport>
{
    let runs = load_runs(path)?;
    let plan = select_runs(path, &runs, selection)?;
    debug!(recorded = runs.len(), selected = plan.len(), "replay plan ready");
    run_session(&plan, opts, runner)
}
