//! `autorepro replay`: re-run recorded commands and compare exit codes.

use anyhow::Result;
use tracing::instrument;

use crate::cli::{AppContext, ReplayArgs};
use crate::cli_ext::exec_cmd::{
    check_repo, print_report, resolve_env, resolve_timeout, session_options,
};
use crate::core::error::ReproError;
use crate::core::replay::{load_runs, replay, select_runs};
use crate::core::selection::{Selection, parse_indexes};
use crate::core::session::{ProcessRunner, SessionMode};
use crate::infra::config::Config;

#[instrument(skip_all, fields(from = %args.from.display()))]
pub fn run(
    args: ReplayArgs,
    ctx: &AppContext,
    cfg: &Config,
) -> Result<i32>
{
    let timeout = resolve_timeout(&args.run, cfg)?;
    check_repo(&args.repo)?;
    let selection = match &args.indexes
    {
        Some(raw) => Selection::Explicit(parse_indexes(raw).map_err(ReproError::from)?),
        None => Selection::All,
    };
    let env = resolve_env(&args.run)?;

    if ctx.dry_run
    {
        let runs = load_runs(&args.from)?;
        let chosen = select_runs(&args.from, &runs, &selection)?;
        println!("DRY RUN: would replay {} command(s):", chosen.len());
        for c in &chosen
        {
            println!("  [{}] {}", c.index, c.cmd);
        }
        return Ok(0);
    }

    let opts = session_options(SessionMode::Replay, args.repo.clone(), &args.run, env, timeout);
    let report = replay(&args.from, &selection, &opts, &mut ProcessRunner)?;

    print_report(&report, ctx);
    Ok(report
        .summary
        .exit_code())
}
