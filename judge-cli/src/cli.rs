//! Command-line surface (spec §4.J — ambient stack).
//!
//! `run` is the default: load config, start the scheduler, serve
//! telemetry. `check-config` parses and validates the config file and
//! exits, for deploy-time validation — the same `run`/subcommand shape the
//! example pack's CLI tools use.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "judged")]
#[command(about = "Periodic pull scheduler for the alert judging engine")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the TOML configuration file.
    #[arg(short, long, env = "JUDGED_CONFIG", default_value = "config.toml", global = true)]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load configuration, start the scheduler, and serve /health + /metrics.
    Run,
    /// Parse and validate the configuration file, then exit.
    CheckConfig,
}
