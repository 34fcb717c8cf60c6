use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::selection::SelectionRequest;
use crate::infra::io::parse_env_assignment;

/// Shared application context for global flags
#[derive(Clone, Debug, Default)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
    pub verbose: bool,  // global --verbose
}

#[derive(Parser)]
#[command(name = "autorepro")]
#[command(
    about = "Turn an issue description into ranked reproduction commands, run them, and replay the session"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without executing
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Enable debug logging (overridden by AUTOREPRO_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rank candidate reproduction commands for an issue
    Suggest(SuggestArgs),

    /// Run one or more suggested commands and record the session
    Exec(ExecArgs),

    /// Re-run commands from a recorded JSONL session
    Replay(ReplayArgs),

    /// Initialize an autorepro.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Inputs shared by every command that plans suggestions
#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Issue description text
    #[arg(long, conflicts_with = "file")]
    pub desc: Option<String>,

    /// File containing the issue description ('-' for stdin)
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Repository root used for language detection and as working directory
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Detected languages to use instead of scanning the repository
    #[arg(long = "lang", value_name = "NAME")]
    pub langs: Vec<String>,

    /// Drop suggestions scoring below this (config default: 2)
    #[arg(long)]
    pub min_score: Option<i64>,

    /// Fail with exit code 1 when nothing matches
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Debug)]
pub struct SuggestArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Show at most N suggestions
    #[arg(long)]
    pub limit: Option<usize>,

    /// Emit JSON output (single-line)
    #[arg(long)]
    pub json: bool,
}

/// Which suggestions to run
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Run the suggestion at this index
    #[arg(long)]
    pub index: Option<usize>,

    /// Run every suggestion
    #[arg(long)]
    pub all: bool,

    /// Comma-separated indices and inclusive ranges, e.g. "0,2-4"
    #[arg(long, value_name = "LIST")]
    pub indexes: Option<String>,
}

impl From<SelectionArgs> for SelectionRequest {
    fn from(a: SelectionArgs) -> Self {
        SelectionRequest { indexes: a.indexes, all: a.all, index: a.index }
    }
}

/// Execution and recording options shared by `exec` and `replay`
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Stop after the first command that exits 0
    #[arg(long)]
    pub until_success: bool,

    /// Per-command timeout in seconds (config default: 120)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Extra environment variable for the commands (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_assignment)]
    pub env: Vec<(String, String)>,

    /// Load environment variables from a dotenv-style file
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Write run and summary records to this JSONL file
    #[arg(long)]
    pub jsonl: Option<PathBuf>,

    /// Also write the summary record to this JSON file
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Write full stdout/stderr of each command into this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ExecArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// JSONL file produced by `autorepro exec --jsonl`
    #[arg(long = "from", value_name = "PATH")]
    pub from: PathBuf,

    /// Recorded run indices to replay, e.g. "0,2-4" (default: all)
    #[arg(long, value_name = "LIST")]
    pub indexes: Option<String>,

    /// Working directory for replayed commands
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
