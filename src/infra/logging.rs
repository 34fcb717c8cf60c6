//! Tracing subscriber setup. Logs go to stderr so stdout stays clean for
//! tables and JSON.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives
pub const LOG_ENV: &str = "AUTOREPRO_LOG";

/// Install the global subscriber. `AUTOREPRO_LOG` wins; otherwise `warn`,
/// or `debug` with `--verbose`.
pub fn init(verbose: bool)
{
    let fallback = if verbose { "autorepro=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    // A second init (tests, embedding) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
