// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Supervisor runtime.
//!
//! Turns a loaded [`SupervisorConfig`] into the pieces the commands use:
//! a connection manager, a discovered network and the optional snapshot
//! record.

use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::Path;

use tracing::info;

use euro_config::SupervisorConfig;
use euro_modbus::{ConnectionManager, EuroNetwork, JsonLinesSink, RtuBus, RtuOpener};

use crate::error::{BinError, BinResult};

/// Snapshot record writer.
pub type RecordSink = JsonLinesSink<BufWriter<File>>;

// =============================================================================
// Supervisor
// =============================================================================

/// Loaded configuration plus the operations every command starts from.
#[derive(Debug, Clone)]
pub struct Supervisor {
    config: SupervisorConfig,
}

impl Supervisor {
    /// Creates a supervisor from a validated configuration.
    pub fn new(config: SupervisorConfig) -> Self {
        Self { config }
    }

    /// Loads and validates the configuration at `path`.
    pub fn load(path: impl AsRef<Path>) -> BinResult<Self> {
        let path = path.as_ref();
        let config = euro_config::load_config(path)
            .map_err(|e| BinError::from(e).with_context(format!("Loading {}", path.display())))?;
        Ok(Self::new(config))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Builds a connection manager for real serial ports.
    pub fn manager(&self) -> BinResult<ConnectionManager<RtuOpener>> {
        let settings = self.config.bus.to_bus_settings()?;
        Ok(ConnectionManager::rtu(settings)
            .with_calibration(self.config.calibration)
            .with_limits(self.config.limits))
    }

    /// Discovers the controller network over the configured ID range.
    pub async fn connect(&self) -> BinResult<EuroNetwork<RtuBus>> {
        let manager = self.manager()?;
        let ids = self.config.bus.id_range.to_range();

        info!(
            port_kind = %self.config.bus.port_kind,
            device_dir = %self.config.bus.device_dir.display(),
            start = ids.start(),
            end = ids.end(),
            "Searching for controllers"
        );

        let network = manager.discover_configured(ids).await?;
        info!(
            port = %network.port().display(),
            controllers = ?network.connected_ids(),
            "Connected"
        );
        Ok(network)
    }

    /// Opens the configured snapshot record for appending.
    pub fn open_record(&self) -> BinResult<Option<RecordSink>> {
        let Some(path) = &self.config.record else {
            return Ok(None);
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                BinError::from(e).with_context(format!("Opening record {}", path.display()))
            })?;

        info!(path = %path.display(), "Recording snapshots");
        Ok(Some(JsonLinesSink::new(BufWriter::new(file))))
    }
}

// =============================================================================
// Tests
// =============================================================================
