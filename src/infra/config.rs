use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};

/// Environment flag that turns on plugin load diagnostics
pub const PLUGINS_DEBUG_ENV: &str = "AUTOREPRO_PLUGINS_DEBUG";
/// Extra comma-separated rule files, appended to `plugins.sources`
pub const PLUGINS_ENV: &str = "AUTOREPRO_PLUGINS";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Suggestion planning defaults
    pub suggest: SuggestConfig,

    /// Execution defaults
    pub exec: ExecConfig,

    /// Rule plugin sources
    pub plugins: PluginConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestConfig
{
    pub min_score: i64,
    pub strict: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig
{
    pub timeout_secs: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig
{
    /// TOML rule files, loaded in order
    pub sources: Vec<String>,
    pub debug: bool,
}

impl Default for SuggestConfig
{
    fn default() -> Self
    {
        Self { min_score: 2, strict: false }
    }
}

impl Default for ExecConfig
{
    fn default() -> Self
    {
        Self { timeout_secs: 120 }
    }
}

impl Config
{
    /// Configured sources plus any listed in `AUTOREPRO_PLUGINS`
    pub fn plugin_sources(&self) -> Vec<String>
    {
        let mut sources = self
            .plugins
            .sources
            .clone();
        if let Ok(extra) = std::env::var(PLUGINS_ENV)
        {
            sources.extend(
                extra
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
        }
        sources
    }

    /// Whether plugin failures should be logged
    pub fn plugins_debug(&self) -> bool
    {
        self.plugins
            .debug
            || std::env::var(PLUGINS_DEBUG_ENV)
                .map(|v| is_truthy(&v))
                .unwrap_or(false)
    }
}

fn is_truthy(v: &str) -> bool
{
    matches!(
        v.trim()
            .to_ascii_lowercase()
            .as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn load_config() -> Result<Config>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    let config_paths = ["autorepro.toml", ".autorepro.toml", "autorepro.json"];

    for path in &config_paths
    {
        if Path::new(path).exists()
        {
            builder = builder.add_source(config::File::with_name(path));
            break;
        }
    }

    // AUTOREPRO__SECTION__KEY, e.g. AUTOREPRO__EXEC__TIMEOUT_SECS=30
    builder = builder.add_source(
        config::Environment::with_prefix("AUTOREPRO")
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<i32>
{
    let config_path = args
        .path
        .join("autorepro.toml");

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    if ctx.dry_run
    {
        println!("{toml_string}");
        return Ok(0);
    }

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(0)
}
