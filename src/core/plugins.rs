//! Rule plugins.
//!
//! Extra rules come from an explicit, fixed list of [`RuleProvider`]s
//! assembled at process start. A provider that fails is skipped; the failure
//! is only reported when plugin debugging is on.

use std::path::PathBuf;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::rules::{Rule, RuleRegistry};

/// Something that contributes rules, keyed by ecosystem.
pub trait RuleProvider
{
    /// Short identifier used in diagnostics
    fn name(&self) -> &str;

    /// Produce this provider's rules
    fn register(&self) -> Result<IndexMap<String, Vec<Rule>>>;
}

/// Rules read from a TOML file:
///
/// ```toml
/// [[rules]]
/// ecosystem = "python"
/// cmd = "pytest -q -k smoke"
/// keywords = ["smoke"]
/// weight = 2
/// tags = ["smoke"]
/// ```
#[derive(Debug, Clone)]
pub struct TomlRuleFile
{
    path: PathBuf,
    label: String,
}

#[derive(Debug, Deserialize)]
struct RuleFile
{
    #[serde(default)]
    rules: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize)]
struct RuleEntry
{
    ecosystem: String,
    cmd: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    weight: u32,
    #[serde(default)]
    tags: Vec<String>,
}

impl TomlRuleFile
{
    pub fn new(path: impl Into<PathBuf>) -> Self
    {
        let path = path.into();
        let label = path
            .display()
            .to_string();
        Self { path, label }
    }
}

impl RuleProvider for TomlRuleFile
{
    fn name(&self) -> &str
    {
        &self.label
    }

    fn register(&self) -> Result<IndexMap<String, Vec<Rule>>>
    {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read rule file {}", self.path.display()))?;
        let parsed: RuleFile = toml::from_str(&text)
            .with_context(|| format!("parse rule file {}", self.path.display()))?;

        let mut out: IndexMap<String, Vec<Rule>> = IndexMap::new();
        for entry in parsed.rules
        {
            if entry
                .cmd
                .trim()
                .is_empty()
            {
                anyhow::bail!("rule in {} has an empty cmd", self.path.display());
            }

            let keywords: Vec<&str> = entry
                .keywords
                .iter()
                .map(String::as_str)
                .collect();
            let tags: Vec<&str> = entry
                .tags
                .iter()
                .map(String::as_str)
                .collect();

            out.entry(entry.ecosystem.to_lowercase())
                .or_default()
                .push(Rule::new(entry.cmd, &keywords, entry.weight, &tags));
        }

        Ok(out)
    }
}

/// Build the process-wide registry: built-ins first, then every provider's
/// rules appended in provider order.
pub fn build_registry(
    providers: &[Box<dyn RuleProvider>],
    debug_plugins: bool,
) -> RuleRegistry
{
    let mut registry = RuleRegistry::builtin();

    for provider in providers
    {
        match provider.register()
        {
            Ok(map) =>
            {
                for (ecosystem, rules) in map
                {
                    debug!(provider = provider.name(), %ecosystem, count = rules.len(), "plugin rules");
                    registry.extend(&ecosystem, rules.into_iter().map(Rule::into_plugin));
                }
            }
            Err(err) =>
            {
                if debug_plugins
                {
                    warn!(provider = provider.name(), "failed to load plugin: {err:#}");
                }
            }
        }
    }

    registry
}

/// Providers for a list of rule-file sources (paths may use `~` and `$VAR`).
pub fn providers_from_sources(sources: &[String]) -> Vec<Box<dyn RuleProvider>>
{
    sources
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            let expanded = shellexpand::full(s.trim())
                .map(|c| c.into_owned())
                .unwrap_or_else(|_| s.trim().to_string());
            Box::new(TomlRuleFile::new(expanded)) as Box<dyn RuleProvider>
        })
        .collect()
}
