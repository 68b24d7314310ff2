// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `discover`: find the controller port and list responders
//! - `poll`: read snapshots once, N times, or until Ctrl-C
//! - `set-output` / `set-setpoint`: command one loop
//! - `shutdown`: drive every loop to zero output and close the port
//! - `validate`: check the configuration file
//! - `version`: show version information

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use euro_modbus::LoopId;

// =============================================================================
// Main CLI Structure
// =============================================================================

/// Supervisor for Eurotherm 2704 controllers on a Modbus RTU bus.
#[derive(Parser, Debug)]
#[command(
    name = "eurotherm",
    author = "Sylvex <contact@sylvex.io>",
    version = euro_modbus::VERSION,
    about = "Supervisor for Eurotherm 2704 controllers over Modbus RTU",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "eurotherm.yaml",
        env = "EURO_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error); defaults to the config file
    #[arg(short, long, env = "EURO_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log format; defaults to the config file
    #[arg(long, env = "EURO_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (warnings and errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Find the port with responding controllers
    Discover(DiscoverArgs),

    /// Poll controller snapshots
    ///
    /// Without --interval or --count a single poll is made.
    Poll(PollArgs),

    /// Set the output power of one loop (switches it to manual)
    #[command(name = "set-output")]
    SetOutput(LoopCommandArgs),

    /// Set the setpoint of one loop (switches it to auto)
    #[command(name = "set-setpoint")]
    SetSetpoint(LoopCommandArgs),

    /// Drive every loop to zero output and close the port
    Shutdown,

    /// Validate the configuration file
    Validate(ValidateArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `discover` command.
#[derive(Args, Debug, Clone, Default)]
pub struct DiscoverArgs {
    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `poll` command.
#[derive(Args, Debug, Clone, Default)]
pub struct PollArgs {
    /// Time between polls (e.g. 500ms, 2s); overrides the config file
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Number of polls before stopping
    #[arg(short = 'n', long)]
    pub count: Option<u64>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

impl PollArgs {
    /// Returns `true` if polling repeats.
    pub fn is_continuous(&self) -> bool {
        self.interval.is_some() || self.count.map_or(false, |n| n > 1)
    }
}

/// Arguments for `set-output` and `set-setpoint`.
#[derive(Args, Debug, Clone)]
pub struct LoopCommandArgs {
    /// Controller slave ID
    pub id: u8,

    /// Loop (1, 2, 3 or loop1, loop2, loop3)
    pub loop_id: LoopId,

    /// Value in engineering units
    #[arg(allow_negative_numbers = true)]
    pub value: f64,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<euro_config::LogFormat> for LogFormat {
    fn from(format: euro_config::LogFormat) -> Self {
        match format {
            euro_config::LogFormat::Text => LogFormat::Text,
            euro_config::LogFormat::Json => LogFormat::Json,
            euro_config::LogFormat::Compact => LogFormat::Compact,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the log level, falling back to `configured`.
    pub fn effective_log_level<'a>(&'a self, configured: &'a str) -> &'a str {
        if self.quiet {
            "warn"
        } else {
            self.log_level.as_deref().unwrap_or(configured)
        }
    }

    /// Returns the log format, falling back to `configured`.
    pub fn effective_log_format(&self, configured: euro_config::LogFormat) -> LogFormat {
        self.log_format.unwrap_or_else(|| configured.into())
    }
}

// =============================================================================
// Tests
// =============================================================================
