//! Keyword extraction for issue text.
//!
//! Normalizes free-form issue descriptions and pulls out the test-tool and
//! ecosystem labels the planner scores against. Two sources feed the result:
//! a fixed table of known patterns, and every keyword declared by the rules
//! currently registered.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::rules::RuleRegistry;

/// How a keyword is located in normalized text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordPattern
{
    /// One token, matched only between word boundaries
    SingleWord(&'static str),
    /// A literal multi-word phrase, matched with boundaries on both ends
    Phrase(&'static str),
}

impl KeywordPattern
{
    fn literal(&self) -> &'static str
    {
        match self
        {
            KeywordPattern::SingleWord(s) | KeywordPattern::Phrase(s) => s,
        }
    }
}

/// Fixed table of (label, pattern) pairs recognized in every issue.
const KEYWORD_TABLE: &[(&str, KeywordPattern)] = &[
    // python
    ("pytest", KeywordPattern::SingleWord("pytest")),
    ("unittest", KeywordPattern::SingleWord("unittest")),
    ("tox", KeywordPattern::SingleWord("tox")),
    ("nox", KeywordPattern::SingleWord("nox")),
    ("doctest", KeywordPattern::SingleWord("doctest")),
    ("python", KeywordPattern::SingleWord("python")),
    // node
    ("jest", KeywordPattern::SingleWord("jest")),
    ("vitest", KeywordPattern::SingleWord("vitest")),
    ("mocha", KeywordPattern::SingleWord("mocha")),
    ("karma", KeywordPattern::SingleWord("karma")),
    ("playwright", KeywordPattern::SingleWord("playwright")),
    ("cypress", KeywordPattern::SingleWord("cypress")),
    ("npm test", KeywordPattern::Phrase("npm test")),
    ("pnpm test", KeywordPattern::Phrase("pnpm test")),
    ("yarn test", KeywordPattern::Phrase("yarn test")),
    ("npm", KeywordPattern::SingleWord("npm")),
    // go
    ("go test", KeywordPattern::Phrase("go test")),
    ("gotestsum", KeywordPattern::SingleWord("gotestsum")),
    // rust
    ("cargo test", KeywordPattern::Phrase("cargo test")),
    ("cargo", KeywordPattern::SingleWord("cargo")),
    ("rust", KeywordPattern::SingleWord("rust")),
    ("nextest", KeywordPattern::SingleWord("nextest")),
    // jvm
    ("maven", KeywordPattern::SingleWord("maven")),
    ("mvn", KeywordPattern::SingleWord("mvn")),
    ("gradle", KeywordPattern::SingleWord("gradle")),
    ("junit", KeywordPattern::SingleWord("junit")),
    // ruby
    ("ruby", KeywordPattern::SingleWord("ruby")),
    ("rspec", KeywordPattern::SingleWord("rspec")),
    ("rake", KeywordPattern::SingleWord("rake")),
    ("minitest", KeywordPattern::SingleWord("minitest")),
];

/// Characters treated as markup noise and replaced by whitespace
const NOISE_CHARS: &[char] = &['`', '*', '#', '>', '<', '"', '\'', '~', '[', ']', '{', '}', '|'];

static COMPILED_TABLE: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    KEYWORD_TABLE
        .iter()
        .filter_map(|(label, pattern)| {
            bounded_regex(pattern.literal()).map(|re| (*label, re))
        })
        .collect()
});

/// Lower-case `text`, replace markdown/quote noise with spaces and collapse
/// whitespace runs. `None` and empty input yield an empty string.
pub fn normalize(text: Option<&str>) -> String
{
    let Some(text) = text
    else
    {
        return String::new();
    };

    let lowered: String = text
        .to_lowercase()
        .chars()
        .map(|c| if NOISE_CHARS.contains(&c) { ' ' } else { c })
        .collect();

    lowered
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract matched keyword labels from already-normalized text.
///
/// Fixed-table patterns use word boundaries. Rule keywords use word
/// boundaries when they are a single word and plain substring matching when
/// they contain whitespace.
pub fn extract_keywords(
    normalized: &str,
    registry: &RuleRegistry,
) -> BTreeSet<String>
{
    let mut found = BTreeSet::new();
    if normalized.is_empty()
    {
        return found;
    }

    for (label, re) in COMPILED_TABLE.iter()
    {
        if re.is_match(normalized)
        {
            found.insert((*label).to_string());
        }
    }

    for keyword in registry.all_keywords()
    {
        let needle = keyword.to_lowercase();
        if needle.is_empty() || found.contains(&needle)
        {
            continue;
        }

        let hit = if needle.contains(char::is_whitespace)
        {
            normalized.contains(&needle)
        }
        else
        {
            contains_word(normalized, &needle)
        };

        if hit
        {
            found.insert(needle);
        }
    }

    found
}

/// Word-boundary containment via explicit tokenization: `word` must be
/// flanked by non-word characters (or the string edges).
fn contains_word(
    haystack: &str,
    word: &str,
) -> bool
{
    haystack
        .match_indices(word)
        .any(|(start, m)| {
            let before = haystack[..start]
                .chars()
                .next_back();
            let after = haystack[start + m.len()..]
                .chars()
                .next();
            !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
        })
}

fn is_word_char(c: char) -> bool
{
    c.is_alphanumeric() || c == '_'
}

fn bounded_regex(literal: &str) -> Option<Regex>
{
    let pattern = format!(r"(?:^|[^\w]){}(?:$|[^\w])", regex::escape(literal));
    Regex::new(&pattern).ok()
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn empty_registry() -> RuleRegistry
    {
        RuleRegistry::empty()
    }

    #[test]
    fn normalize_strips_markup_and_collapses_whitespace()
    {
        let text = "## Bug\n\n`pytest` fails   with **\"ImportError\"** <here>";
        assert_eq!(normalize(Some(text)), "bug pytest fails with importerror here");
    }

    #[test]
    fn normalize_handles_missing_input()
    {
        assert_eq!(normalize(None), "");
        assert_eq!(normalize(Some("   \n\t")), "");
    }

    #[test]
    fn single_words_respect_boundaries()
    {
        let registry = empty_registry();
        let kws = extract_keywords("running pytest-xdist and jester", &registry);
        assert!(kws.contains("pytest"));
        assert!(!kws.contains("jest"));
    }

    #[test]
    fn phrases_are_matched_literally()
    {
        let registry = empty_registry();
        let kws = extract_keywords("after npm test the go tests hang", &registry);
        assert!(kws.contains("npm test"));
        assert!(kws.contains("npm"));
        assert!(!kws.contains("go test"));
    }

    #[test]
    fn rule_keywords_are_scanned_too()
    {
        let registry = RuleRegistry::builtin();
        let kws = extract_keywords("the jest watch mode crashes", &registry);
        assert!(kws.contains("jest"));
    }

    #[test]
    fn empty_text_yields_nothing()
    {
        let registry = RuleRegistry::builtin();
        assert!(extract_keywords("", &registry).is_empty());
    }

    #[test]
    fn contains_word_handles_symbols()
    {
        assert!(contains_word("build with c++ today", "c++"));
        assert!(!contains_word("cargo_test", "cargo"));
        assert!(contains_word("cargo", "cargo"));
    }
}
