// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `shutdown` command.

use crate::error::{BinError, BinResult};
use crate::runtime::Supervisor;

/// Discovers the network, then drives every loop to zero output.
pub async fn shutdown(supervisor: &Supervisor) -> BinResult<()> {
    let network = supervisor.connect().await?;
    let outcome = network.shutdown().await?;

    println!(
        "Shut down {}: {} loop(s) zeroed, {} failed",
        network.port().display(),
        outcome.loops_zeroed,
        outcome.failures
    );

    if outcome.failures > 0 {
        return Err(BinError::runtime(format!(
            "{} loop(s) did not accept the fail-safe writes",
            outcome.failures
        )));
    }
    Ok(())
}
