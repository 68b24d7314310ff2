// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! `eurotherm` binary entry point.

use euro_bin::cli::Cli;
use euro_bin::commands;
use euro_bin::error::report_error_and_exit;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    if let Err(error) = commands::execute(cli).await {
        tracing::error!(error = %error, code = error.exit_code(), "Command failed");
        report_error_and_exit(error);
    }
}
