// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `set-output` and `set-setpoint` commands.
//!
//! The port is released afterwards without fail-safe writes so the loop
//! keeps the commanded value.

use tracing::info;

use euro_modbus::{EuroNetwork, EuroResult, LoopId, RtuBus};

use crate::cli::LoopCommandArgs;
use crate::error::BinResult;
use crate::runtime::Supervisor;

/// Switches a loop to manual and sets its output power.
pub async fn set_output(supervisor: &Supervisor, args: LoopCommandArgs) -> BinResult<()> {
    let limits = supervisor.config().limits;
    limits.check_output(args.value).map_err(euro_modbus::EuroError::from)?;

    let network = supervisor.connect().await?;
    let result = network.set_output(args.id, args.loop_id, args.value).await;
    finish(&network, result, "output", args).await
}

/// Switches a loop to auto and sets its setpoint.
pub async fn set_setpoint(supervisor: &Supervisor, args: LoopCommandArgs) -> BinResult<()> {
    let limits = supervisor.config().limits;
    limits.check_setpoint(args.value).map_err(euro_modbus::EuroError::from)?;

    let network = supervisor.connect().await?;
    let result = network.set_setpoint(args.id, args.loop_id, args.value).await;
    finish(&network, result, "setpoint", args).await
}

async fn finish(
    network: &EuroNetwork<RtuBus>,
    result: EuroResult<usize>,
    quantity: &str,
    args: LoopCommandArgs,
) -> BinResult<()> {
    let released = network.release().await;
    let written = result?;
    released?;

    let LoopCommandArgs { id, loop_id, value } = args;
    info!(id, loop_id = %loop_id, quantity, value, bytes = written, "Loop commanded");
    println!("{}", describe(id, loop_id, quantity, value, written));
    Ok(())
}

fn describe(id: u8, loop_id: LoopId, quantity: &str, value: f64, written: usize) -> String {
    format!(
        "Controller {} {}: {} set to {} ({} payload bytes)",
        id, loop_id, quantity, value, written
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        assert_eq!(
            describe(2, LoopId::Loop3, "output", 35.0, 2),
            "Controller 2 loop3: output set to 35 (2 payload bytes)"
        );
    }
}
