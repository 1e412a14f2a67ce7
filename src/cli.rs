// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::policy::PolicyKind;

/// Command-line arguments for `dagsched`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dagsched",
    version,
    about = "Evaluate scheduling heuristics on a simulated DAG job cluster.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Dagsched.toml")]
    pub config: String,

    /// Which policy to evaluate.
    #[arg(long, value_enum, default_value_t = PolicyChoice::All)]
    pub policy: PolicyChoice,

    /// Episodes per policy.
    #[arg(long, default_value_t = 10)]
    pub episodes: usize,

    /// Seed of the first episode; episode `i` uses `seed + i`.
    #[arg(long, default_value_t = 500)]
    pub seed: u64,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAGSCHED_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved config, but run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Policy selection as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum PolicyChoice {
    Fifo,
    Scpt,
    Lcpt,
    Random,
    All,
}

impl PolicyChoice {
    pub fn kinds(self) -> Vec<PolicyKind> {
        match self {
            PolicyChoice::Fifo => vec![PolicyKind::Fifo],
            PolicyChoice::Scpt => vec![PolicyKind::ShortestCriticalPath],
            PolicyChoice::Lcpt => vec![PolicyKind::LongestCriticalPath],
            PolicyChoice::Random => vec![PolicyKind::Random],
            PolicyChoice::All => PolicyKind::ALL.to_vec(),
        }
    }
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

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
