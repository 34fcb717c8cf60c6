//! **autorepro** - Turn an issue description into ranked reproduction commands
//!
//! Keyword extraction and rule scoring produce a ranked plan; selected
//! commands run one at a time under a timeout, and every run is recorded as
//! JSONL that can later be replayed and compared.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Subcommand handlers wiring the CLI to the core engine
pub mod cli_ext {
    pub mod exec_cmd;
    pub mod replay_cmd;
    pub mod suggest_cmd;
}

/// Planning, execution, recording and replay
pub mod core {
    /// Repository language detection from marker files
    pub mod detect;

    /// Error taxonomy and exit codes
    pub mod error;
    pub use error::{ReproError, exit_code_for};

    /// Single-command execution with timeout and process-group kill
    pub mod executor;
    pub use executor::{ExecRequest, ExecutionResult, execute};

    /// Text normalization and keyword extraction
    pub mod keywords;

    /// Suggestion scoring and ranking
    pub mod planner;
    pub use planner::{Suggestion, suggest};

    /// Rule provider trait and TOML rule files
    pub mod plugins;

    /// JSONL replay
    pub mod replay;

    /// Built-in rules and the ecosystem registry
    pub mod rules;
    pub use rules::{Rule, RuleRegistry, RuleSource};

    /// Index selection parsing and resolution
    pub mod selection;

    /// Orchestration loop and JSONL recorder
    pub mod session;
    pub use session::{CommandRunner, SessionReport, run_session};
}

/// Infrastructure - Configuration, I/O, and logging
pub mod infra {
    /// Layered configuration (file + AUTOREPRO__ environment)
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Issue input, env files and JSONL output
    pub mod io;

    /// Tracing subscriber setup
    pub mod logging;
}

pub use cli::{AppContext, Cli, Commands};
pub use infra::{Config, load_config};
