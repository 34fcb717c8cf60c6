use anyhow::Result;
use clap::Parser;
use autorepro::cli::{AppContext, Cli, Commands};
use autorepro::cli_ext::{exec_cmd, replay_cmd, suggest_cmd};
use autorepro::core::exit_code_for;
use autorepro::infra::logging;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
        verbose: cli.verbose,
    };

    match dispatch(cli.command, &ctx) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(exit_code_for(&err));
        }
    }
}

fn dispatch(command: Commands, ctx: &AppContext) -> Result<i32> {
    match command {
        Commands::Suggest(args) => suggest_cmd::run(args, ctx, &autorepro::load_config()?),
        Commands::Exec(args) => exec_cmd::run(args, ctx, &autorepro::load_config()?),
        Commands::Replay(args) => replay_cmd::run(args, ctx, &autorepro::load_config()?),
        Commands::Init(args) => autorepro::infra::config::init(args, ctx),
        Commands::Completions(args) => autorepro::completion::run(args, ctx),
    }
}
