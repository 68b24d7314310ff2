// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # euro-modbus
//!
//! Modbus RTU communication with Eurotherm 2704 PID controllers.
//!
//! - **Port discovery**: lazy scan of the device directory by name family
//! - **Register map**: fixed loop/field addressing and fixed-point scaling
//! - **Networks**: one exclusively owned bus per port, up to three controllers
//! - **Loop control**: mode-then-value writes for output power and setpoints
//! - **Snapshots**: polled working values per controller and loop
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐    path    ┌──────────────────────────────────┐
//! │ DeviceDirectory  │ ─────────▶ │ ConnectionManager::discover      │
//! └──────────────────┘            └──────────────────────────────────┘
//!                                                  │
//!                                                  ▼
//!                                 ┌──────────────────────────────────┐
//!                                 │ EuroNetwork<T: BusTransport>     │
//!                                 │  set_output / set_setpoint       │
//!                                 │  poll_all / shutdown             │
//!                                 └──────────────────────────────────┘
//!                                                  │ registers::address
//!                                                  ▼
//!                                 ┌──────────────────────────────────┐
//!                                 │ RtuBus (tokio-modbus, 19200-8N1) │
//!                                 └──────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use euro_modbus::{BusSettings, ConnectionManager, LoopId, SerialPortKind, SnapshotTable};
//!
//! let manager = ConnectionManager::rtu(BusSettings::default());
//! let network = manager.discover(SerialPortKind::TtyUsb, 1..=10).await?;
//!
//! network.set_output(1, LoopId::Loop2, 35.0).await?;
//!
//! let mut table = SnapshotTable::for_network(&network);
//! network.poll_all(&mut table).await?;
//!
//! network.shutdown().await?;
//! ```
//!
//! ### Error Handling
//!
//! ```rust,ignore
//! use euro_modbus::{ErrorKind, EuroResult};
//!
//! fn handle(result: EuroResult<usize>) {
//!     if let Err(error) = result {
//!         if error.kind() == ErrorKind::Range {
//!             return;
//!         }
//!         for hint in error.recovery_hints() {
//!             println!("Hint: {}", hint);
//!         }
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod client;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod network;
pub mod registers;
pub mod reporter;
pub mod sink;
pub mod snapshot;
pub mod types;

// =============================================================================
// Re-exports
// =============================================================================

pub use client::{BusOpener, BusStats, BusTransport, RtuBus, RtuOpener};
pub use controller::COMMAND_PAYLOAD_BYTES;
pub use discovery::{DeviceDirectory, PortMatches};
pub use error::{
    ConnectionError, ErrorCode, ErrorKind, ErrorSeverity, EuroError, EuroResult, InvalidArgument,
    IoError, RangeError,
};
pub use network::{ConnectionManager, EuroNetwork, ShutdownOutcome};
pub use registers::{address, decode, decode_signed, encode, ControlMode, LoopId, RegisterField};
pub use reporter::{
    ErrorReporter, FailureReport, NullReporter, Origin, RecordingReporter, TracingReporter,
};
pub use sink::{JsonLinesSink, MemorySink, SnapshotSink};
pub use snapshot::{EuroSnapshot, LoopState, PollSummary, SnapshotTable, SENTINEL};
pub use types::{
    validate_id_range, BusSettings, BusSettingsBuilder, Calibration, DataBits, Limits, Parity,
    SerialPortKind, StopBits, BROADCAST_ID, MAX_CONTROLLERS, MAX_SLAVE_ID,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
