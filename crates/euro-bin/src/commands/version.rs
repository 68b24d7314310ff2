// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use euro_modbus::{address, LoopId, RegisterField, MAX_CONTROLLERS};

use crate::cli::Cli;
use crate::error::BinResult;

const MAPPED_FIELDS: [(RegisterField, &str); 7] = [
    (RegisterField::Pv, "PV"),
    (RegisterField::TargetSp, "TargetSP"),
    (RegisterField::TargetOp, "TargetOP"),
    (RegisterField::WkgOp, "WkgOP"),
    (RegisterField::WkgSp, "WkgSP"),
    (RegisterField::ErrVal, "ErrVal"),
    (RegisterField::ManAutoFlag, "ManAuto"),
];

/// Prints crate versions and the register map this build speaks.
pub fn version(_cli: &Cli) -> BinResult<()> {
    println!(
        "eurotherm {} (euro-modbus {}, euro-config {})",
        crate::VERSION,
        euro_modbus::VERSION,
        euro_config::VERSION
    );
    println!("Eurotherm 2704 supervisor, up to {} controllers per bus", MAX_CONTROLLERS);
    println!();

    print!("{:<10}", "Register");
    for loop_id in LoopId::ALL {
        print!("{:>8}", format!("Loop{}", loop_id.number()));
    }
    println!();

    for (field, label) in MAPPED_FIELDS {
        print!("{:<10}", label);
        for loop_id in LoopId::ALL {
            print!("{:>8}", address(loop_id, field));
        }
        println!();
    }

    println!();
    println!("Built for {}-{}", std::env::consts::ARCH, std::env::consts::OS);
    Ok(())
}
