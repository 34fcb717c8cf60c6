//! Language detection from repository marker files.
//!
//! The planner treats the detected list as opaque evidence; this detector
//! only looks for well-known files in the repository root.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;

/// Supplies the ecosystem names detected for a repository
pub trait LanguageDetector
{
    fn detect(
        &self,
        repo: &Path,
    ) -> Vec<String>;
}

/// Root-level marker files and the language they indicate
const MARKERS: &[(&str, &str)] = &[
    ("pyproject.toml", "python"),
    ("setup.py", "python"),
    ("setup.cfg", "python"),
    ("requirements.txt", "python"),
    ("pytest.ini", "python"),
    ("tox.ini", "python"),
    ("package.json", "node"),
    ("pnpm-lock.yaml", "node"),
    ("yarn.lock", "node"),
    ("go.mod", "go"),
    ("Cargo.toml", "rust"),
    ("pom.xml", "java"),
    ("build.gradle", "java"),
    ("build.gradle.kts", "java"),
    ("Gemfile", "ruby"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerFileDetector;

impl LanguageDetector for MarkerFileDetector
{
    fn detect(
        &self,
        repo: &Path,
    ) -> Vec<String>
    {
        let found: BTreeSet<&str> = MARKERS
            .iter()
            .filter(|(file, _)| {
                repo.join(file)
                    .is_file()
            })
            .map(|(_, lang)| *lang)
            .collect();

        debug!(repo = %repo.display(), langs = ?found, "detected languages");

        found
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}
