//! Orchestration loop and JSONL recorder.
//!
//! Each planned command moves `Pending -> Running -> Recorded`; once the loop
//! is exhausted (or stopped early by until-success) the session is
//! `Summarized`. Commands run strictly one after another, and run lines are
//! written in execution order followed by exactly one summary line.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::core::error::{EXIT_FAILURE, EXIT_OK};
use crate::core::executor::{self, EXIT_NOT_FOUND, EXIT_TIMEOUT, ExecRequest, ExecutionResult};
use crate::infra::io::{JsonlWriter, write_json_file};

pub const SCHEMA_VERSION: u32 = 1;
pub const TOOL_NAME: &str = "autorepro";

/// Runs one command; the seam between orchestration and process spawning.
pub trait CommandRunner
{
    fn run(
        &mut self,
        req: &ExecRequest,
    ) -> ExecutionResult;
}

/// Spawns real child processes
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner
{
    fn run(
        &mut self,
        req: &ExecRequest,
    ) -> ExecutionResult
    {
        executor::execute(req)
    }
}

/// Live execution or replay of a recorded session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode
{
    Live,
    Replay,
}

/// One command queued for execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommand
{
    pub index: usize,
    pub cmd: String,
    /// Exit code from the recorded session (replay only)
    pub original_exit_code: Option<i32>,
}

/// Session-wide settings
#[derive(Debug, Clone)]
pub struct SessionOptions
{
    pub mode: SessionMode,
    pub cwd: PathBuf,
    /// Merged environment, copied fresh for every command
    pub env: BTreeMap<String, String>,
    pub timeout: Duration,
    pub until_success: bool,
    pub jsonl: Option<PathBuf>,
    pub summary: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

/// A `"type": "run"` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord
{
    #[serde(rename = "type")]
    pub kind: String,
    pub index: usize,
    pub cmd: String,
    pub start_ts: String,
    pub end_ts: String,
    pub exit_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code_original: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code_replay: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub timed_out: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_path: Option<String>,
    #[serde(default)]
    pub stdout_preview: String,
    #[serde(default)]
    pub stderr_preview: String,
}

impl RunRecord
{
    fn new(
        planned: &PlannedCommand,
        result: &ExecutionResult,
    ) -> Self
    {
        let (exit_code_replay, matched) = match planned.original_exit_code
        {
            Some(original) => (Some(result.exit_code), Some(original == result.exit_code)),
            None => (None, None),
        };

        Self {
            kind: "run".to_string(),
            index: planned.index,
            cmd: planned
                .cmd
                .clone(),
            start_ts: iso_seconds(result.start),
            end_ts: iso_seconds(result.end),
            exit_code: result.exit_code,
            exit_code_original: planned.original_exit_code,
            exit_code_replay,
            matched,
            duration_ms: result.duration_ms,
            timed_out: result.timed_out,
            stdout_path: None,
            stderr_path: None,
            stdout_preview: result.stdout_preview(),
            stderr_preview: result.stderr_preview(),
        }
    }

    pub fn success(&self) -> bool
    {
        self.exit_code == 0
    }
}

/// Counters computed once the loop ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary
{
    pub mode: SessionMode,
    pub runs: usize,
    pub successes: usize,
    pub failures: usize,
    pub first_success_index: Option<usize>,
    pub matches: Option<usize>,
    pub mismatches: Option<usize>,
    /// Exit code of the only run, when exactly one command ran
    sole_exit_code: Option<i32>,
}

impl SessionSummary
{
    pub fn from_runs(
        mode: SessionMode,
        runs: &[RunRecord],
    ) -> Self
    {
        let successes = runs
            .iter()
            .filter(|r| r.success())
            .count();
        let first_success_index = runs
            .iter()
            .find(|r| r.success())
            .map(|r| r.index);

        let (matches, mismatches) = match mode
        {
            SessionMode::Live => (None, None),
            SessionMode::Replay =>
            {
                let m = runs
                    .iter()
                    .filter(|r| r.matched == Some(true))
                    .count();
                (Some(m), Some(runs.len() - m))
            }
        };

        Self {
            mode,
            runs: runs.len(),
            successes,
            failures: runs.len() - successes,
            first_success_index,
            matches,
            mismatches,
            sole_exit_code: match runs
            {
                [only] => Some(only.exit_code),
                _ => None,
            },
        }
    }

    /// 0 when anything succeeded. Otherwise a lone timeout or missing
    /// executable propagates its own code, and everything else is 1.
    pub fn exit_code(&self) -> i32
    {
        if self.successes > 0
        {
            return EXIT_OK;
        }
        match self.sole_exit_code
        {
            Some(code) if code == EXIT_TIMEOUT || code == EXIT_NOT_FOUND => code,
            _ => EXIT_FAILURE,
        }
    }

    pub fn to_record(&self) -> SummaryRecord
    {
        let replay = self.mode == SessionMode::Replay;
        SummaryRecord {
            kind: "summary",
            schema_version: SCHEMA_VERSION,
            tool: TOOL_NAME,
            mode: replay.then_some("replay"),
            runs: self.runs,
            successes: self.successes,
            failures: replay.then_some(self.failures),
            first_success_index: self.first_success_index,
            matches: self.matches,
            mismatches: self.mismatches,
        }
    }
}

/// The trailing `"type": "summary"` line
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRecord
{
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub schema_version: u32,
    pub tool: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
    pub runs: usize,
    pub successes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures: Option<usize>,
    pub first_success_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatches: Option<usize>,
}

/// Everything a finished session produced
#[derive(Debug, Clone)]
pub struct SessionReport
{
    pub runs: Vec<RunRecord>,
    pub summary: SessionSummary,
}

/// Sole writer of the JSONL stream, per-command logs and the summary file.
struct Recorder
{
    jsonl: Option<JsonlWriter>,
    log_dir: Option<PathBuf>,
    summary_path: Option<PathBuf>,
    /// Runs recorded so far; keeps log names unique when indices repeat
    seq: usize,
}

impl Recorder
{
    fn open(opts: &SessionOptions) -> Result<Self>
    {
        let jsonl = opts
            .jsonl
            .as_deref()
            .map(JsonlWriter::create)
            .transpose()?;

        if let Some(dir) = &opts.log_dir
        {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log dir {}", dir.display()))?;
        }

        Ok(Self {
            jsonl,
            log_dir: opts
                .log_dir
                .clone(),
            summary_path: opts
                .summary
                .clone(),
            seq: 0,
        })
    }

    fn record_run(
        &mut self,
        record: &mut RunRecord,
        result: &ExecutionResult,
    ) -> Result<()>
    {
        if let Some(dir) = &self.log_dir
        {
            let (out, err) = write_command_logs(dir, self.seq, record.index, result)?;
            record.stdout_path = Some(out);
            record.stderr_path = Some(err);
        }

        if let Some(w) = self
            .jsonl
            .as_mut()
        {
            w.append(record)?;
        }
        self.seq += 1;
        Ok(())
    }

    fn finish(
        &mut self,
        summary: &SessionSummary,
    ) -> Result<()>
    {
        let record = summary.to_record();
        if let Some(w) = self
            .jsonl
            .as_mut()
        {
            w.append(&record)?;
        }
        if let Some(path) = &self.summary_path
        {
            write_json_file(path, &record)?;
        }
        Ok(())
    }
}

/// `run_{seq}_cmd_{index}.{stdout,stderr}.log`
fn write_command_logs(
    dir: &Path,
    seq: usize,
    index: usize,
    result: &ExecutionResult,
) -> Result<(String, String)>
{
    let out = dir.join(format!("run_{seq:03}_cmd_{index}.stdout.log"));
    let err = dir.join(format!("run_{seq:03}_cmd_{index}.stderr.log"));
    fs::write(&out, &result.stdout).with_context(|| format!("Failed to write {}", out.display()))?;
    fs::write(&err, &result.stderr).with_context(|| format!("Failed to write {}", err.display()))?;
    Ok((
        out.display()
            .to_string(),
        err.display()
            .to_string(),
    ))
}

/// ISO-8601 UTC with second precision and a `Z` suffix
pub fn iso_seconds(ts: DateTime<Utc>) -> String
{
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Execute `plan` in order, recording each run, and summarize.
///
/// A failing command never stops the loop; with `until_success` the first
/// exit code 0 does, and the remaining commands are neither run nor recorded.
#[instrument(skip_all, fields(commands = plan.len(), mode = ?opts.mode))]
pub fn run_session(
    plan: &[PlannedCommand],
    opts: &SessionOptions,
    runner: &mut dyn CommandRunner,
) -> Result<SessionReport>
{
    let mut recorder = Recorder::open(opts)?;
    let mut runs = Vec::with_capacity(plan.len());

    for planned in plan
    {
        let req = ExecRequest {
            cmd: planned
                .cmd
                .clone(),
            cwd: opts
                .cwd
                .clone(),
            env: opts
                .env
                .clone(),
            timeout: opts.timeout,
        };

        info!(index = planned.index, cmd = %planned.cmd, "running");
        let result = runner.run(&req);

        let mut record = RunRecord::new(planned, &result);
        recorder.record_run(&mut record, &result)?;
        let succeeded = record.success();
        runs.push(record);

        if opts.until_success && succeeded
        {
            debug!(index = planned.index, "stopping after first success");
            break;
        }
    }

    let summary = SessionSummary::from_runs(opts.mode, &runs);
    recorder.finish(&summary)?;

    Ok(SessionReport { runs, summary })
}
