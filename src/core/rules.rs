//! Rule registry: the command table the planner scores.
//!
//! Built-in rules live in a compiled table grouped by ecosystem. Plugin
//! providers (see [`crate::core::plugins`]) append to it once at startup;
//! afterwards the registry is only ever read.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Where a rule came from; plugin rules win exact ranking ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSource
{
    Plugin,
    Builtin,
}

/// A command plus the evidence that justifies suggesting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule
{
    pub cmd: String,
    pub keywords: BTreeSet<String>,
    /// Specificity weight; any value above zero earns the +1 bonus
    pub weight: u32,
    pub tags: BTreeSet<String>,
    pub source: RuleSource,
}

impl Rule
{
    pub fn new(
        cmd: impl Into<String>,
        keywords: &[&str],
        weight: u32,
        tags: &[&str],
    ) -> Self
    {
        Self {
            cmd: cmd.into(),
            keywords: keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            weight,
            tags: tags
                .iter()
                .map(|t| t.to_string())
                .collect(),
            source: RuleSource::Builtin,
        }
    }

    /// Same rule, marked as plugin-provided
    pub fn into_plugin(mut self) -> Self
    {
        self.source = RuleSource::Plugin;
        self
    }
}

/// Ecosystems that stay dormant until one of their trigger keywords shows up.
/// Every other ecosystem (the base set, and any a plugin introduces) is
/// always active.
const GATED_ECOSYSTEMS: &[(&str, &[&str])] = &[
    ("rust", &["rust", "cargo", "cargo test", "nextest"]),
    ("java", &["maven", "mvn", "gradle", "junit"]),
    ("ruby", &["ruby", "rspec", "rake", "minitest"]),
];

/// Map a detected language name onto the ecosystem key rules are grouped by.
pub fn ecosystem_for_language(lang: &str) -> Option<&'static str>
{
    match lang
        .trim()
        .to_lowercase()
        .as_str()
    {
        "python" | "py" => Some("python"),
        "node" | "nodejs" | "javascript" | "js" | "typescript" | "ts" => Some("node"),
        "go" | "golang" => Some("go"),
        "rust" => Some("rust"),
        "java" | "kotlin" | "jvm" => Some("java"),
        "ruby" => Some("ruby"),
        _ => None,
    }
}

/// Registry of rules keyed by ecosystem, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry
{
    ecosystems: IndexMap<String, Vec<Rule>>,
}

impl RuleRegistry
{
    /// A registry with no rules at all
    pub fn empty() -> Self
    {
        Self::default()
    }

    /// The compiled-in rule table
    pub fn builtin() -> Self
    {
        let mut ecosystems = IndexMap::new();

        ecosystems.insert(
            "python".to_string(),
            vec![
                Rule::new("pytest -q", &["pytest"], 3, &["tests"]),
                Rule::new("python -m pytest -q", &["pytest"], 2, &["tests"]),
                Rule::new("python -m unittest -v", &["unittest"], 2, &["tests"]),
                Rule::new("pytest --doctest-modules -q", &["doctest"], 2, &["tests", "docs"]),
                Rule::new("tox -q", &["tox"], 2, &["tests", "env"]),
                Rule::new("nox", &["nox"], 1, &["tests", "env"]),
            ],
        );

        ecosystems.insert(
            "node".to_string(),
            vec![
                Rule::new("npm test -s", &["npm test", "npm"], 1, &["tests"]),
                Rule::new("pnpm test", &["pnpm test"], 1, &["tests"]),
                Rule::new("yarn test", &["yarn test"], 1, &["tests"]),
                Rule::new("npx jest -w=1", &["jest"], 3, &["tests", "unit"]),
                Rule::new("npx vitest run", &["vitest"], 3, &["tests", "unit"]),
                Rule::new("npx mocha", &["mocha"], 2, &["tests", "unit"]),
                Rule::new("npx karma start --single-run", &["karma"], 2, &["tests", "browser"]),
                Rule::new("npx playwright test", &["playwright"], 3, &["tests", "e2e"]),
                Rule::new("npx cypress run", &["cypress"], 3, &["tests", "e2e"]),
            ],
        );

        ecosystems.insert(
            "go".to_string(),
            vec![
                Rule::new("go test ./... -run .", &["go test"], 2, &["tests"]),
                Rule::new("gotestsum --format short-verbose", &["gotestsum"], 2, &["tests"]),
            ],
        );

        ecosystems.insert(
            "rust".to_string(),
            vec![
                Rule::new("cargo test", &["cargo test", "cargo", "rust"], 2, &["tests"]),
                Rule::new("cargo nextest run", &["nextest"], 3, &["tests"]),
            ],
        );

        ecosystems.insert(
            "java".to_string(),
            vec![
                Rule::new("mvn -q -DskipTests=false test", &["maven", "mvn", "junit"], 2, &["tests"]),
                Rule::new("./gradlew test", &["gradle", "junit"], 2, &["tests"]),
            ],
        );

        ecosystems.insert(
            "ruby".to_string(),
            vec![
                Rule::new("bundle exec rspec", &["rspec"], 3, &["tests"]),
                Rule::new("bundle exec rake test", &["rake", "minitest"], 2, &["tests"]),
            ],
        );

        Self { ecosystems }
    }

    /// Append rules under `ecosystem`, creating the key if needed.
    /// Existing rules are never touched, so duplicates stay duplicated.
    pub fn extend(
        &mut self,
        ecosystem: &str,
        rules: impl IntoIterator<Item = Rule>,
    )
    {
        self.ecosystems
            .entry(ecosystem.to_lowercase())
            .or_default()
            .extend(rules);
    }

    /// Iterate `(ecosystem, rules)` in registration order
    pub fn ecosystems(&self) -> impl Iterator<Item = (&str, &[Rule])>
    {
        self.ecosystems
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Every keyword declared by any rule, deduplicated
    pub fn all_keywords(&self) -> BTreeSet<&str>
    {
        self.ecosystems
            .values()
            .flatten()
            .flat_map(|r| {
                r.keywords
                    .iter()
                    .map(String::as_str)
            })
            .collect()
    }

    /// Whether `ecosystem` takes part in scoring for this keyword set
    pub fn is_active(
        &self,
        ecosystem: &str,
        keywords: &BTreeSet<String>,
    ) -> bool
    {
        match GATED_ECOSYSTEMS
            .iter()
            .find(|(name, _)| *name == ecosystem)
        {
            Some((_, triggers)) => triggers
                .iter()
                .any(|t| keywords.contains(*t)),
            None => true,
        }
    }

    pub fn rule_count(&self) -> usize
    {
        self.ecosystems
            .values()
            .map(Vec::len)
            .sum()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn kw(words: &[&str]) -> BTreeSet<String>
    {
        words
            .iter()
            .map(|w| w.to_string())
            .collect()
    }

    #[test]
    fn base_ecosystems_are_always_active()
    {
        let reg = RuleRegistry::builtin();
        let none = kw(&[]);
        assert!(reg.is_active("python", &none));
        assert!(reg.is_active("node", &none));
        assert!(reg.is_active("go", &none));
    }

    #[test]
    fn gated_ecosystems_need_a_trigger()
    {
        let reg = RuleRegistry::builtin();
        assert!(!reg.is_active("rust", &kw(&["pytest"])));
        assert!(reg.is_active("rust", &kw(&["cargo test"])));
        assert!(!reg.is_active("java", &kw(&[])));
        assert!(reg.is_active("java", &kw(&["gradle"])));
    }

    #[test]
    fn extend_appends_without_replacing()
    {
        let mut reg = RuleRegistry::builtin();
        let before = reg.rule_count();
        reg.extend("python", [Rule::new("pytest -q", &["pytest"], 1, &[]).into_plugin()]);
        assert_eq!(reg.rule_count(), before + 1);

        let python: Vec<_> = reg
            .ecosystems()
            .find(|(name, _)| *name == "python")
            .map(|(_, rules)| rules.to_vec())
            .unwrap();
        let dupes = python
            .iter()
            .filter(|r| r.cmd == "pytest -q")
            .count();
        assert_eq!(dupes, 2);
    }

    #[test]
    fn plugin_ecosystems_are_active()
    {
        let mut reg = RuleRegistry::empty();
        reg.extend("Elixir", [Rule::new("mix test", &["exunit"], 1, &[]).into_plugin()]);
        assert!(reg.is_active("elixir", &kw(&[])));
        assert!(reg.all_keywords().contains("exunit"));
    }

    #[test]
    fn language_mapping_is_case_insensitive()
    {
        assert_eq!(ecosystem_for_language("TypeScript"), Some("node"));
        assert_eq!(ecosystem_for_language("python"), Some("python"));
        assert_eq!(ecosystem_for_language("cobol"), None);
    }
}
