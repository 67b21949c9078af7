//! Chord CLI - Command-line interface
//!
//! Runs the streaming server and manages the track catalog.

mod commands;

use std::path::Path;

use anyhow::Context;
use chord_core::tracing_setup::{CliLogLevel, init_tracing};
use clap::Parser;

#[derive(Parser)]
#[command(name = "chord")]
#[command(about = "A music streaming server")]
struct Cli {
    /// Console log level
    #[arg(long, global = true, value_enum, default_value_t = CliLogLevel::Info)]
    log_level: CliLogLevel,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_tracing_level(), Some(Path::new("logs")))
        .context("Failed to initialize logging")?;

    commands::handle_command(cli.command).await
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level_is_accepted_after_subcommand() {
        let cli = Cli::try_parse_from(["chord", "serve", "--port", "4000", "--log-level", "debug"])
            .unwrap();
        assert_eq!(cli.log_level, CliLogLevel::Debug);
    }
}
