//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log filter:
//! 1. `--verbose` selects `debug`
//! 2. `TODO_LOG` environment variable (e.g. "info", "todo_cli=trace")
//! 3. default to `warn`
//!
//! Logs always go to stderr so JSON output on stdout stays parseable.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted for the log filter
pub const LOG_ENV: &str = "TODO_LOG";

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = build_filter(verbose, std::env::var(LOG_ENV).ok().as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))
}

fn build_filter(verbose: bool, env_value: Option<&str>) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }

    env_value
        .and_then(|value| EnvFilter::try_new(value.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_wins_over_environment() {
        assert_eq!(build_filter(true, Some("error")).to_string(), "debug");
    }

    #[test]
    fn environment_value_is_used() {
        assert_eq!(build_filter(false, Some("info")).to_string(), "info");
    }

    #[test]
    fn defaults_to_warn() {
        assert_eq!(build_filter(false, None).to_string(), "warn");
    }
}
