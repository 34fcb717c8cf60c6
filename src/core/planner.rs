//! Suggestion scoring and ranking.
//!
//! Scores every rule in the active ecosystems against extracted keywords and
//! externally detected languages, drops anything under `min_score`, and sorts
//! the survivors into a total order:
//!
//! 1. score, descending
//! 2. matched keyword count, descending
//! 3. plugin rules before built-in rules
//! 4. command string, ascending

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::core::rules::{RuleRegistry, RuleSource, ecosystem_for_language};

const KEYWORD_POINTS: i64 = 3;
const LANGUAGE_POINTS: i64 = 2;
const SPECIFICITY_POINTS: i64 = 1;

/// Why a rule scored what it did. Rendered as
/// `matched keywords: …; detected langs: …; bonuses: …` with empty segments
/// omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Rationale
{
    pub matched_keywords: Vec<String>,
    pub matched_langs: Vec<String>,
    pub bonuses: Vec<String>,
}

impl fmt::Display for Rationale
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        let mut segments = Vec::with_capacity(3);
        if !self
            .matched_keywords
            .is_empty()
        {
            segments.push(format!("matched keywords: {}", self.matched_keywords.join(", ")));
        }
        if !self
            .matched_langs
            .is_empty()
        {
            segments.push(format!("detected langs: {}", self.matched_langs.join(", ")));
        }
        if !self
            .bonuses
            .is_empty()
        {
            segments.push(format!("bonuses: {}", self.bonuses.join(", ")));
        }
        write!(f, "{}", segments.join("; "))
    }
}

/// A ranked candidate command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion
{
    pub cmd: String,
    pub score: i64,
    pub rationale: Rationale,
    pub source: RuleSource,
    pub ecosystem: String,
}

impl Suggestion
{
    /// Ranking total order (see module docs)
    pub fn rank_cmp(
        &self,
        other: &Self,
    ) -> Ordering
    {
        other
            .score
            .cmp(&self.score)
            .then_with(|| {
                other
                    .rationale
                    .matched_keywords
                    .len()
                    .cmp(
                        &self
                            .rationale
                            .matched_keywords
                            .len(),
                    )
            })
            .then_with(|| self.source.cmp(&other.source))
            .then_with(|| self.cmd.cmp(&other.cmd))
    }
}

/// Flat JSON view of a suggestion with the rendered rationale
#[derive(Debug, Serialize)]
pub struct SuggestionView<'a>
{
    pub cmd: &'a str,
    pub score: i64,
    pub rationale: String,
    pub matched_keywords: &'a [String],
    pub matched_langs: &'a [String],
    pub source: RuleSource,
    pub ecosystem: &'a str,
}

impl<'a> From<&'a Suggestion> for SuggestionView<'a>
{
    fn from(s: &'a Suggestion) -> Self
    {
        Self {
            cmd: &s.cmd,
            score: s.score,
            rationale: s
                .rationale
                .to_string(),
            matched_keywords: &s
                .rationale
                .matched_keywords,
            matched_langs: &s
                .rationale
                .matched_langs,
            source: s.source,
            ecosystem: &s.ecosystem,
        }
    }
}

/// Sort in place under the ranking order
pub fn rank(suggestions: &mut [Suggestion])
{
    suggestions.sort_by(Suggestion::rank_cmp);
}

/// Score every active rule and return the ranked list of those reaching
/// `min_score`.
#[instrument(skip(registry, keywords), fields(keywords = keywords.len()))]
pub fn suggest(
    registry: &RuleRegistry,
    keywords: &BTreeSet<String>,
    detected_langs: &[String],
    min_score: i64,
) -> Vec<Suggestion>
{
    let langs: Vec<String> = detected_langs
        .iter()
        .map(|l| {
            l.trim()
                .to_lowercase()
        })
        .filter(|l| !l.is_empty())
        .unique()
        .collect();

    let mut out = Vec::new();

    for (ecosystem, rules) in registry.ecosystems()
    {
        if !registry.is_active(ecosystem, keywords)
        {
            debug!(ecosystem, "ecosystem inactive");
            continue;
        }

        let matched_langs: Vec<String> = langs
            .iter()
            .filter(|l| ecosystem_for_language(l) == Some(ecosystem))
            .cloned()
            .collect();

        for rule in rules
        {
            let matched_keywords: Vec<String> = rule
                .keywords
                .iter()
                .filter(|k| keywords.contains(*k))
                .cloned()
                .collect();

            let mut score = 0;
            let mut bonuses = Vec::new();

            for k in &matched_keywords
            {
                score += KEYWORD_POINTS;
                bonuses.push(format!("direct: {k} (+{KEYWORD_POINTS})"));
            }
            for l in &matched_langs
            {
                score += LANGUAGE_POINTS;
                bonuses.push(format!("lang: {l} (+{LANGUAGE_POINTS})"));
            }
            if rule.weight > 0 && score > 0
            {
                score += SPECIFICITY_POINTS;
                bonuses.push(format!("specific (+{SPECIFICITY_POINTS})"));
            }

            if score < min_score
            {
                continue;
            }

            out.push(Suggestion {
                cmd: rule
                    .cmd
                    .clone(),
                score,
                rationale: Rationale {
                    matched_keywords,
                    matched_langs: matched_langs.clone(),
                    bonuses,
                },
                source: rule.source,
                ecosystem: ecosystem.to_string(),
            });
        }
    }

    rank(&mut out);
    debug!(count = out.len(), "suggestions ranked");
    out
}
