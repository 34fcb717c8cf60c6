//! `autorepro suggest`: plan and print ranked candidate commands.
//!
//! Planning is shared with `exec`, which runs a selection of the same list.

use std::collections::BTreeSet;

use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled};
use tracing::{debug, instrument};

use crate::cli::{AppContext, PlanArgs, SuggestArgs};
use crate::core::detect::{LanguageDetector, MarkerFileDetector};
use crate::core::error::ReproError;
use crate::core::keywords::{extract_keywords, normalize};
use crate::core::planner::{Suggestion, SuggestionView, suggest};
use crate::core::plugins::{build_registry, providers_from_sources};
use crate::infra::config::Config;
use crate::infra::io::read_issue_text;

/// Everything the planner saw and produced
#[derive(Debug)]
pub struct Plan
{
    pub keywords: BTreeSet<String>,
    pub detected_langs: Vec<String>,
    pub min_score: i64,
    pub suggestions: Vec<Suggestion>,
}

/// Read the issue, load rules and rank suggestions.
///
/// Fails with [`ReproError::NoCandidates`] when strict mode is on and
/// nothing survives `min_score`.
#[instrument(skip_all, fields(repo = %args.repo.display()))]
pub fn plan(
    args: &PlanArgs,
    cfg: &Config,
) -> Result<Plan>
{
    let text = read_issue_text(args.desc.as_deref(), args.file.as_deref())?;
    let normalized = normalize(Some(&text));

    let providers = providers_from_sources(&cfg.plugin_sources());
    let registry = build_registry(&providers, cfg.plugins_debug());

    let detected_langs = if args.langs.is_empty()
    {
        MarkerFileDetector.detect(&args.repo)
    }
    else
    {
        args.langs
            .iter()
            .flat_map(|l| l.split(','))
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect()
    };

    let keywords = extract_keywords(&normalized, &registry);
    let min_score = args
        .min_score
        .unwrap_or(cfg.suggest.min_score);
    let suggestions = suggest(&registry, &keywords, &detected_langs, min_score);

    debug!(?keywords, ?detected_langs, count = suggestions.len(), "plan ready");

    if suggestions.is_empty() && (args.strict || cfg.suggest.strict)
    {
        return Err(ReproError::NoCandidates.into());
    }

    Ok(Plan { keywords, detected_langs, min_score, suggestions })
}

#[derive(Serialize)]
struct SuggestOutput<'a>
{
    keywords: &'a BTreeSet<String>,
    detected_langs: &'a [String],
    min_score: i64,
    suggestions: Vec<SuggestionView<'a>>,
}

#[derive(Tabled)]
struct SuggestionRow
{
    #[tabled(rename = "#")]
    index: usize,
    score: i64,
    cmd: String,
    rationale: String,
}

pub fn run(
    args: SuggestArgs,
    ctx: &AppContext,
    cfg: &Config,
) -> Result<i32>
{
    let plan = plan(&args.plan, cfg)?;
    let shown = &plan.suggestions[..args
        .limit
        .unwrap_or(plan.suggestions.len())
        .min(plan.suggestions.len())];

    if args.json
    {
        let out = SuggestOutput {
            keywords: &plan.keywords,
            detected_langs: &plan.detected_langs,
            min_score: plan.min_score,
            suggestions: shown
                .iter()
                .map(SuggestionView::from)
                .collect(),
        };
        println!("{}", serde_json::to_string(&out)?);
        return Ok(0);
    }

    if shown.is_empty()
    {
        if !ctx.quiet
        {
            eprintln!("No suggestions reached min score {}", plan.min_score);
        }
        return Ok(0);
    }

    let rows: Vec<SuggestionRow> = shown
        .iter()
        .enumerate()
        .map(|(index, s)| SuggestionRow {
            index,
            score: s.score,
            cmd: s
                .cmd
                .clone(),
            rationale: s
                .rationale
                .to_string(),
        })
        .collect();

    if !ctx.quiet
    {
        let heading = format!("Suggestions ({} of {})", shown.len(), plan.suggestions.len());
        if ctx.no_color
        {
            println!("{heading}");
        }
        else
        {
            println!("{}", heading.bold());
        }
    }
    println!("{}", Table::new(rows));

    Ok(0)
}
