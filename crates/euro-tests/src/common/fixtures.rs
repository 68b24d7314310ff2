// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built networks, device directories and configuration files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use euro_modbus::{
    address, BusSettings, Calibration, ConnectionManager, ControlMode, EuroNetwork, Limits, LoopId,
    RecordingReporter, RegisterField,
};

use super::mocks::{MockBus, MockOpener};

// =============================================================================
// Network Fixtures
// =============================================================================

/// A probed network on a [`MockBus`] plus the handles a test inspects.
pub struct NetworkFixture {
    /// The network under test.
    pub network: EuroNetwork<MockBus>,
    /// Shared handle to the line.
    pub bus: MockBus,
    /// Every failure the network reported.
    pub reporter: Arc<RecordingReporter>,
}

impl NetworkFixture {
    /// Probes `ids` on a line where `responders` answer.
    ///
    /// Panics if no responder is found.
    pub async fn probed(responders: &[u8], ids: std::ops::RangeInclusive<u8>) -> Self {
        let bus = MockBus::with_responders(responders.iter().copied());
        let reporter = Arc::new(RecordingReporter::new());
        let mut network = EuroNetwork::new(bus.clone(), "/dev/ttyUSB0")
            .with_calibration(Calibration::default())
            .with_limits(Limits::default())
            .with_reporter(reporter.clone());

        network
            .probe(ids)
            .await
            .expect("fixture probe should find a responder");
        bus.reset_counters();

        Self {
            network,
            bus,
            reporter,
        }
    }

    /// One controller with ID 1.
    pub async fn single() -> Self {
        Self::probed(&[1], 1..=3).await
    }

    /// Three controllers with IDs 1, 2 and 3.
    pub async fn full() -> Self {
        Self::probed(&[1, 2, 3], 1..=3).await
    }
}

// =============================================================================
// Register Fixtures
// =============================================================================

/// Raw register values for one loop.
#[derive(Debug, Clone, Copy)]
pub struct LoopRegisters {
    /// Raw `PV`.
    pub pv: u16,
    /// Raw `WkgSp`.
    pub wkg_sp: u16,
    /// Raw `WkgOp`.
    pub wkg_op: u16,
    /// Mode flag.
    pub mode: ControlMode,
}

impl LoopRegisters {
    /// A loop at 812.5 degrees tracking an 850.0 setpoint at 42 % output.
    pub fn heating() -> Self {
        Self {
            pv: 8125,
            wkg_sp: 8500,
            wkg_op: 42,
            mode: ControlMode::Auto,
        }
    }

    /// Stores these values on `bus` for `slave` and `loop_id`.
    pub fn install(self, bus: &MockBus, slave: u8, loop_id: LoopId) {
        bus.set_register(slave, address(loop_id, RegisterField::Pv), self.pv);
        bus.set_register(slave, address(loop_id, RegisterField::WkgSp), self.wkg_sp);
        bus.set_register(slave, address(loop_id, RegisterField::WkgOp), self.wkg_op);
        bus.set_register(
            slave,
            address(loop_id, RegisterField::ManAutoFlag),
            self.mode.register_value(),
        );
    }
}

// =============================================================================
// Device Directory Fixtures
// =============================================================================

/// A temporary device directory.
pub struct DeviceDirFixture {
    dir: TempDir,
}

impl DeviceDirFixture {
    /// Creates a directory holding empty files named `names`.
    pub fn with_devices(names: &[&str]) -> Self {
        let dir = tempfile::Builder::new()
            .prefix("euro-dev")
            .tempdir()
            .expect("Failed to create temp directory");
        for name in names {
            std::fs::write(dir.path().join(name), b"").expect("Failed to create device file");
        }
        Self { dir }
    }

    /// Returns the directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the path of device `name`.
    pub fn device(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Builds bus settings scanning this directory.
    pub fn settings(&self) -> BusSettings {
        BusSettings::builder()
            .device_dir(self.path())
            .build()
            .expect("fixture settings are valid")
    }

    /// Builds a connection manager over this directory.
    pub fn manager(&self, opener: MockOpener) -> ConnectionManager<MockOpener> {
        ConnectionManager::new(opener, self.settings())
    }
}

// =============================================================================
// Config Fixtures
// =============================================================================

/// Configuration file contents.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// A complete YAML configuration.
    pub fn full_yaml() -> &'static str {
        r#"
bus:
  device_dir: /dev
  port_kind: ttyUSB
  baud_rate: 19200
  data_bits: 8
  parity: none
  stop_bits: 1
  response_timeout: 50ms
  id_range:
    start: 1
    end: 3

calibration:
  pv_resolution: 1
  setpoint_resolution: 1
  output_resolution: 0

limits:
  max_output: 100
  max_setpoint: 5000

poll:
  interval: 1s

logging:
  level: info
  format: text
"#
    }

    /// The same configuration in TOML.
    pub fn full_toml() -> &'static str {
        r#"
[bus]
device_dir = "/dev"
port_kind = "ttyUSB"
baud_rate = 19200
data_bits = 8
parity = "none"
stop_bits = 1
response_timeout = "50ms"

[bus.id_range]
start = 1
end = 3

[calibration]
pv_resolution = 1
setpoint_resolution = 1
output_resolution = 0

[limits]
max_output = 100.0
max_setpoint = 5000.0

[poll]
interval = "1s"

[logging]
level = "info"
format = "text"
"#
    }

    /// Writes `content` to a temporary file with `suffix`.
    pub fn write(content: &str, suffix: &str) -> tempfile::NamedTempFile {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::with_suffix(suffix).expect("Failed to create temp file");
        file.write_all(content.as_bytes()).expect("Failed to write temp file");
        file
    }
}
