//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::config::Config;

/// Run command arguments.
#[derive(Debug, Default, Args)]
pub struct RunCommand {
    /// UDP port to receive Horus packets on
    #[arg(short = 'l', long, value_name = "PORT")]
    pub listen_port: Option<u16>,

    /// Host of the BaseStation consumer
    #[arg(long, value_name = "HOST")]
    pub sink_host: Option<String>,

    /// Port of the BaseStation consumer
    #[arg(long, value_name = "PORT")]
    pub sink_port: Option<u16>,
}

impl RunCommand {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = self.listen_port {
            config.listener.port = port;
        }
        if let Some(host) = &self.sink_host {
            config.sink.host.clone_from(host);
        }
        if let Some(port) = self.sink_port {
            config.sink.port = port;
        }
    }
}

/// Identifier cache commands.
#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// List assigned identifiers, most recently used first
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Resolve a callsign, assigning an identifier if it has none
    Resolve {
        /// Radiosonde callsign
        callsign: String,
    },

    /// Remove every assignment
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the identifier state file path
    Path,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
