// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `dagfire`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dagfire",
    version,
    about = "Run a DAG of shell commands under a global deadline.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Dagfire.toml")]
    pub config: String,

    /// Override `[config].deadline_ms` for this run. Must be >= 1.
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub deadline_ms: Option<u64>,

    /// Start from this node instead of every node without dependencies.
    /// May be given several times.
    #[arg(long = "root", value_name = "ID")]
    pub roots: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAGFIRE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the graph, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
