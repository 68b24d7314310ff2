// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Abstract bus transport.
//!
//! [`BusTransport`] is one open serial line shared by every controller on
//! it; each call names the slave it addresses. [`BusOpener`] opens a
//! transport for a candidate device path during discovery.

use std::path::Path;

use async_trait::async_trait;

use crate::error::EuroResult;
use crate::types::BusSettings;

// =============================================================================
// BusTransport Trait
// =============================================================================

/// One open half-duplex Modbus RTU line.
///
/// Operations take `&mut self`: at most one request is in flight per line.
///
/// # Implementors
///
/// - [`RtuBus`](super::rtu::RtuBus): tokio-modbus over a serial port
#[async_trait]
pub trait BusTransport: Send {
    /// Reads holding registers (FC 03) from `slave`.
    ///
    /// # Arguments
    ///
    /// * `slave` - Slave ID (1-247)
    /// * `address` - Starting register address
    /// * `count` - Number of registers to read
    async fn read_holding_registers(
        &mut self,
        slave: u8,
        address: u16,
        count: u16,
    ) -> EuroResult<Vec<u16>>;

    /// Writes a single holding register (FC 06) on `slave`.
    async fn write_single_register(&mut self, slave: u8, address: u16, value: u16) -> EuroResult<()>;

    /// Closes the line. Further calls on this transport fail.
    async fn disconnect(&mut self) -> EuroResult<()>;

    /// Returns a display name for this transport.
    fn display_name(&self) -> String;
}

// =============================================================================
// BusOpener Trait
// =============================================================================

/// Opens a [`BusTransport`] on a device path.
#[async_trait]
pub trait BusOpener: Send + Sync {
    /// The transport produced.
    type Transport: BusTransport + 'static;

    /// Opens `path` with the given line settings.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionError`](crate::error::ConnectionError) if the
    /// port cannot be opened or configured.
    async fn open(&self, path: &Path, settings: &BusSettings) -> EuroResult<Self::Transport>;
}
