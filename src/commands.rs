//! CLI command definitions
//!
//! Defines the clap commands for the scenarios CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::common::config::Overrides;

/// Flags selecting and configuring the backend under test
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Backend base URL (overrides config and environment)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Configuration file (default: platform config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Dotenv file to load before reading the environment (default: ./.env)
    #[arg(long)]
    pub env_file: Option<PathBuf>,
}

impl TargetArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.base_url.clone(),
            request_timeout_secs: self.timeout,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run built-in scenario suites against the backend
    Run {
        /// Suites to run, in order (default: all)
        suites: Vec<String>,

        #[command(flatten)]
        target: TargetArgs,

        /// Print the report as JSON after the run
        #[arg(long)]
        json: bool,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// Execute a scenario defined in a YAML file
    Test {
        /// Path to the YAML scenario file, or a name in the scenarios directory
        path: PathBuf,

        #[command(flatten)]
        target: TargetArgs,

        /// Print the report as JSON after the run
        #[arg(long)]
        json: bool,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// List available suites and the endpoints they exercise
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config {
        #[command(flatten)]
        target: TargetArgs,

        /// Write the default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
}

impl Commands {
    /// Whether debug logging was requested
    pub fn verbose(&self) -> bool {
        match self {
            Commands::Run { verbose, .. } | Commands::Test { verbose, .. } => *verbose,
            _ => false,
        }
    }
}
