//! `autorepro exec` and the run options it shares with `replay`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use owo_colors::OwoColorize;
use tracing::{info, instrument};

use crate::cli::{AppContext, ExecArgs, RunArgs};
use crate::cli_ext::suggest_cmd;
use crate::core::error::ReproError;
use crate::core::executor::merge_env;
use crate::core::selection::{SelectionRequest, resolve};
use crate::core::session::{
    PlannedCommand, ProcessRunner, SessionMode, SessionOptions, SessionReport, run_session,
};
use crate::infra::config::Config;
use crate::infra::io::load_env_file;

/// Effective timeout: flag, then config. Zero is rejected.
pub fn resolve_timeout(
    run: &RunArgs,
    cfg: &Config,
) -> Result<Duration, ReproError>
{
    match run
        .timeout
        .unwrap_or(cfg.exec.timeout_secs)
    {
        0 => Err(ReproError::InvalidTimeout),
        secs => Ok(Duration::from_secs(secs)),
    }
}

/// Commands run inside `repo`, so it must exist before anything spawns.
pub fn check_repo(repo: &Path) -> Result<(), ReproError>
{
    if repo.is_dir()
    {
        return Ok(());
    }
    Err(ReproError::InvalidInput(format!("--repo {} is not a directory", repo.display())))
}

/// Current process environment overlaid with `--env-file` and `--env`.
pub fn resolve_env(run: &RunArgs) -> Result<BTreeMap<String, String>>
{
    let from_file = match &run.env_file
    {
        Some(path) => load_env_file(path)?,
        None => Vec::new(),
    };
    Ok(merge_env(std::env::vars(), &from_file, &run.env))
}

/// Session options common to live and replay runs
pub fn session_options(
    mode: SessionMode,
    cwd: PathBuf,
    run: &RunArgs,
    env: BTreeMap<String, String>,
    timeout: Duration,
) -> SessionOptions
{
    SessionOptions {
        mode,
        cwd,
        env,
        timeout,
        until_success: run.until_success,
        jsonl: run
            .jsonl
            .clone(),
        summary: run
            .summary
            .clone(),
        log_dir: run
            .log_dir
            .clone(),
    }
}

/// One status line per run, then the totals
pub fn print_report(
    report: &SessionReport,
    ctx: &AppContext,
)
{
    if ctx.quiet
    {
        return;
    }

    for run in &report.runs
    {
        let status = if run.success() { "ok" } else { "FAIL" };
        let status = match (ctx.no_color, run.success())
        {
            (true, _) => status.to_string(),
            (false, true) => status
                .green()
                .to_string(),
            (false, false) => status
                .red()
                .to_string(),
        };
        let mut line = format!(
            "[{}] {status} exit={} {}ms  {}",
            run.index, run.exit_code, run.duration_ms, run.cmd
        );
        if run.timed_out
        {
            line.push_str("  (timed out)");
        }
        if let Some(matched) = run.matched
        {
            line.push_str(if matched { "  matched" } else { "  MISMATCH" });
        }
        eprintln!("{line}");
    }

    let s = &report.summary;
    let mut totals = format!("{} run(s), {} succeeded", s.runs, s.successes);
    if let (Some(m), Some(mm)) = (s.matches, s.mismatches)
    {
        totals.push_str(&format!(", {m} matched, {mm} mismatched"));
    }
    if ctx.no_color
    {
        eprintln!("{totals}");
    }
    else
    {
        eprintln!("{}", totals.bold());
    }
}

#[instrument(skip_all)]
pub fn run(
    args: ExecArgs,
    ctx: &AppContext,
    cfg: &Config,
) -> Result<i32>
{
    // Option problems surface before planning or spawning anything
    let timeout = resolve_timeout(&args.run, cfg)?;
    check_repo(&args.plan.repo)?;
    let selection = SelectionRequest::from(args.selection)
        .into_selection()
        .map_err(ReproError::from)?;
    let env = resolve_env(&args.run)?;

    let plan = suggest_cmd::plan(&args.plan, cfg)?;
    let indices = resolve(plan.suggestions.len(), &selection).map_err(ReproError::from)?;

    let commands: Vec<PlannedCommand> = indices
        .into_iter()
        .map(|index| PlannedCommand {
            index,
            cmd: plan.suggestions[index]
                .cmd
                .clone(),
            original_exit_code: None,
        })
        .collect();

    if ctx.dry_run
    {
        println!("DRY RUN: would execute {} command(s):", commands.len());
        for c in &commands
        {
            println!("  [{}] {}", c.index, c.cmd);
        }
        return Ok(0);
    }

    info!(count = commands.len(), "executing selection");
    let opts = session_options(SessionMode::Live, args.plan.repo.clone(), &args.run, env, timeout);
    let report = run_session(&commands, &opts, &mut ProcessRunner)?;

    print_report(&report, ctx);
    Ok(report
        .summary
        .exit_code())
}
