// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `discover` command.

use crate::cli::{DiscoverArgs, OutputFormat};
use crate::error::BinResult;
use crate::runtime::Supervisor;

/// Finds the controller port, prints the responders and releases the port.
pub async fn discover(supervisor: &Supervisor, args: DiscoverArgs) -> BinResult<()> {
    let line = supervisor.config().bus.to_bus_settings()?.line_notation();
    let network = supervisor.connect().await?;
    let ids = network.connected_ids();

    match args.format {
        OutputFormat::Text => {
            println!("Port:        {}", network.port().display());
            println!("Line:        {}", line);
            println!(
                "Controllers: {}",
                ids.iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "port": network.port().display().to_string(),
                "line": line,
                "controllers": ids,
                "slots": network.slot_ids(),
                "connected": network.connected_flags(),
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        }
    }

    network.release().await?;
    Ok(())
}
