//! Command-line interface for sondebridge.
//!
//! This module provides the CLI structure for the `sondebridge` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{CacheCommand, ConfigCommand, RunCommand};

/// sondebridge - Plot radiosondes on a BaseStation display
///
/// Receives Horus UDP payload summaries and forwards them as SBS BaseStation
/// messages, giving every radiosonde a stable synthetic Mode-S identifier.
#[derive(Debug, Parser)]
#[command(name = "sondebridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log every emitted BaseStation line
    #[arg(short = 'm', long, global = true)]
    pub echo_messages: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the bridge in the foreground until interrupted
    Run(RunCommand),

    /// Inspect or modify identifier assignments
    #[command(subcommand)]
    Cache(CacheCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli_with(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            echo_messages: false,
            command: Command::Cache(CacheCommand::Path),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "sondebridge");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;

        assert_eq!(cli_with(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli_with(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(cli_with(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(cli_with(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["sondebridge", "run"]).unwrap();
        assert!(matches!(cli.command, Command::Run(_)));
    }

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "sondebridge",
            "run",
            "--listen-port",
            "55674",
            "--sink-host",
            "vrs.local",
            "--sink-port",
            "30001",
        ])
        .unwrap();

        let Command::Run(run) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(run.listen_port, Some(55674));
        assert_eq!(run.sink_host.as_deref(), Some("vrs.local"));
        assert_eq!(run.sink_port, Some(30001));
    }

    #[test]
    fn test_parse_cache_resolve() {
        let cli = Cli::try_parse_from(["sondebridge", "cache", "resolve", "S1234567"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Cache(CacheCommand::Resolve { ref callsign }) if callsign == "S1234567"
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli =
            Cli::try_parse_from(["sondebridge", "-c", "/etc/sondebridge.toml", "cache", "path"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/sondebridge.toml")));
    }

    #[test]
    fn test_parse_with_verbose() {
        let cli = Cli::try_parse_from(["sondebridge", "-vv", "run"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_echo_messages() {
        let cli = Cli::try_parse_from(["sondebridge", "run", "-q", "--echo-messages"]).unwrap();
        assert!(cli.echo_messages);
        assert_eq!(
            cli.verbosity().directives(cli.echo_messages),
            "sondebridge=ERROR,sondebridge::sbs=debug"
        );
    }

    #[test]
    fn test_parse_with_quiet() {
        let cli = Cli::try_parse_from(["sondebridge", "-q", "config", "path"]).unwrap();
        assert!(cli.quiet);
    }
}
