// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `discover`: find the controller port and list responders
//! - `poll`: read and print snapshots
//! - `set-output` / `set-setpoint`: command one loop
//! - `shutdown`: fail-safe shutdown of every loop
//! - `validate`: validate the configuration file
//! - `version`: show version information

mod control;
mod discover;
mod poll;
mod shutdown;
mod validate;
mod version;

pub use control::{set_output, set_setpoint};
pub use discover::discover;
pub use poll::poll;
pub use shutdown::shutdown;
pub use validate::validate;
pub use version::version;

use euro_config::LoggingConfig;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;
use crate::logging::init_logging;
use crate::runtime::Supervisor;

/// Loads configuration, initializes logging and runs the selected command.
pub async fn execute(cli: Cli) -> BinResult<()> {
    if let Commands::Version = cli.command {
        init_logging(cli.effective_log_level("warn"), cli.effective_log_format(Default::default()));
        return version::version(&cli);
    }

    let loaded = Supervisor::load(&cli.config);

    let logging = loaded
        .as_ref()
        .map(|s| s.config().logging.clone())
        .unwrap_or_else(|_| LoggingConfig::default());
    init_logging(
        cli.effective_log_level(logging.level.as_str()),
        cli.effective_log_format(logging.format),
    );

    let supervisor = loaded?;

    match cli.command.clone() {
        Commands::Discover(args) => discover::discover(&supervisor, args).await,
        Commands::Poll(args) => poll::poll(&supervisor, args).await,
        Commands::SetOutput(args) => control::set_output(&supervisor, args).await,
        Commands::SetSetpoint(args) => control::set_setpoint(&supervisor, args).await,
        Commands::Shutdown => shutdown::shutdown(&supervisor).await,
        Commands::Validate(args) => validate::validate(&cli, &supervisor, args),
        Commands::Version => version::version(&cli),
    }
}
