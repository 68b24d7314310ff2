// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use euro_config::SupervisorConfig;
use euro_modbus::{DeviceDirectory, MAX_CONTROLLERS};

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::BinResult;
use crate::runtime::Supervisor;

/// Prints a summary of the loaded configuration and any warnings.
///
/// Loading already rejected invalid files; this reports what would happen
/// at runtime.
pub fn validate(cli: &Cli, supervisor: &Supervisor, args: ValidateArgs) -> BinResult<()> {
    let config = supervisor.config();
    let settings = config.bus.to_bus_settings()?;
    let warnings = collect_warnings(config);

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", cli.config.display());
            println!();
            println!("Summary:");
            println!(
                "  Ports:       {}/{}*",
                config.bus.device_dir.display(),
                config.bus.port_kind.prefix()
            );
            println!("  Line:        {}", settings.line_notation());
            println!(
                "  Timeout:     {}",
                humantime::format_duration(config.bus.response_timeout)
            );
            println!(
                "  IDs:         {}..={}",
                config.bus.id_range.start, config.bus.id_range.end
            );
            println!(
                "  Resolution:  pv {} / sp {} / op {}",
                config.calibration.pv_resolution,
                config.calibration.setpoint_resolution,
                config.calibration.output_resolution
            );
            println!(
                "  Limits:      output {} / setpoint {}",
                config.limits.max_output, config.limits.max_setpoint
            );
            println!(
                "  Poll:        every {}",
                humantime::format_duration(config.poll.interval)
            );
            if let Some(record) = &config.record {
                println!("  Record:      {}", record.display());
            }

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!(
                    "{}",
                    serde_json::to_string_pretty(config)
                        .unwrap_or_else(|_| "(serialization error)".to_string())
                );
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": cli.config.display().to_string(),
                "line": settings.line_notation(),
                "warnings": warnings,
                "config": if args.show_config { Some(config) } else { None },
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        }
    }

    Ok(())
}

fn collect_warnings(config: &SupervisorConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let range = config.bus.id_range;

    if (range.end - range.start) as usize + 1 > MAX_CONTROLLERS {
        warnings.push(format!(
            "ID range {}..={} is wider than {} slots; only the lowest responders are kept",
            range.start, range.end, MAX_CONTROLLERS
        ));
    }

    let devices = DeviceDirectory::new(config.bus.device_dir.clone());
    match devices.matching(config.bus.port_kind) {
        Ok(mut ports) => {
            if ports.next().is_none() {
                warnings.push(format!(
                    "No {}* devices in {}",
                    config.bus.port_kind.prefix(),
                    config.bus.device_dir.display()
                ));
            }
        }
        Err(e) => warnings.push(e.to_string()),
    }

    warnings
}
