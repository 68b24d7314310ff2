// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Controller networks and discovery.
//!
//! A [`EuroNetwork`] exclusively owns one open bus and tracks up to
//! [`MAX_CONTROLLERS`] slave IDs on it. Every transaction against the bus
//! runs under the network's lock, so commands and polls on the same port
//! never interleave frames.
//!
//! [`ConnectionManager`] finds the first serial port with at least one
//! responding controller and hands back its network.
//!
//! # Examples
//!
//! ```rust,ignore
//! use euro_modbus::{ConnectionManager, LoopId, SerialPortKind};
//!
//! let manager = ConnectionManager::rtu(BusSettings::default());
//! let network = manager.discover(SerialPortKind::TtyUsb, 1..=10).await?;
//!
//! network.set_setpoint(1, LoopId::Loop1, 250.0).await?;
//! network.shutdown().await?;
//! ```

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::client::{BusOpener, BusStats, BusTransport, RtuOpener};
use crate::discovery::DeviceDirectory;
use crate::error::{ConnectionError, EuroError, EuroResult, IoError};
use crate::registers::{address, ControlMode, LoopId, RegisterField};
use crate::reporter::{ErrorReporter, FailureReport, Origin, TracingReporter};
use crate::types::{validate_id_range, BusSettings, Calibration, Limits, SerialPortKind, MAX_CONTROLLERS};

// =============================================================================
// EuroNetwork
// =============================================================================

/// One serial port and the controllers answering on it.
pub struct EuroNetwork<T: BusTransport> {
    /// The bus; `None` once shut down.
    pub(crate) bus: Mutex<Option<T>>,
    port: PathBuf,
    display_name: String,
    ids: [u8; MAX_CONTROLLERS],
    connected: [bool; MAX_CONTROLLERS],
    pub(crate) calibration: Calibration,
    pub(crate) limits: Limits,
    reporter: Arc<dyn ErrorReporter>,
    pub(crate) stats: BusStats,
}

/// Result of [`EuroNetwork::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownOutcome {
    /// `true` if the network was already closed and nothing was done.
    pub already_closed: bool,
    /// Loops whose output was driven to zero.
    pub loops_zeroed: usize,
    /// Loops whose fail-safe writes failed.
    pub failures: usize,
}

impl<T: BusTransport> EuroNetwork<T> {
    /// Wraps an open transport. No controllers are tracked until
    /// [`probe`](Self::probe) runs.
    pub fn new(transport: T, port: impl Into<PathBuf>) -> Self {
        let display_name = transport.display_name();
        Self {
            bus: Mutex::new(Some(transport)),
            port: port.into(),
            display_name,
            ids: [0; MAX_CONTROLLERS],
            connected: [false; MAX_CONTROLLERS],
            calibration: Calibration::default(),
            limits: Limits::default(),
            reporter: Arc::new(TracingReporter),
            stats: BusStats::new(),
        }
    }

    /// Sets the register calibration.
    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }

    /// Sets the command limits.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Sets the failure reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    // =========================================================================
    // Probing
    // =========================================================================

    /// Probes every ID in `ids` and records the responders.
    ///
    /// Responders fill the slots in ascending ID order; probing stops once
    /// all slots are filled. Previous slot contents are cleared first.
    ///
    /// # Errors
    ///
    /// - [`InvalidArgument`](crate::error::InvalidArgument) for an empty range
    ///   or one starting at the broadcast ID
    /// - [`ConnectionError::NoResponder`] if no ID answered; all connected
    ///   flags are then false
    pub async fn probe(&mut self, ids: RangeInclusive<u8>) -> EuroResult<usize> {
        let (start, end) = (*ids.start(), *ids.end());
        validate_id_range(start, end)?;

        self.ids = [0; MAX_CONTROLLERS];
        self.connected = [false; MAX_CONTROLLERS];

        let bus = self
            .bus
            .get_mut()
            .as_mut()
            .ok_or_else(EuroError::network_closed)?;

        let probe_address = address(LoopId::Loop1, RegisterField::Pv);
        let mut filled = 0;

        for id in ids {
            if filled == MAX_CONTROLLERS {
                break;
            }

            match read_registers(bus, &self.stats, id, probe_address, 1).await {
                Ok(_) => {
                    tracing::debug!(port = %self.port.display(), slave = id, "Controller answered probe");
                    self.ids[filled] = id;
                    self.connected[filled] = true;
                    filled += 1;
                }
                Err(e) => {
                    tracing::trace!(port = %self.port.display(), slave = id, error = %e, "No answer to probe");
                }
            }
        }

        if filled == 0 {
            return Err(ConnectionError::NoResponder { start, end, ports: 1 }.into());
        }

        tracing::info!(
            port = %self.port.display(),
            controllers = ?self.connected_ids(),
            "Probe complete"
        );
        Ok(filled)
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Drives every connected loop to zero output, then closes the bus.
    ///
    /// Each loop is switched to manual before its `TargetOp` is zeroed.
    /// Failed writes are reported and do not stop the remaining loops or
    /// the close. Waits for any in-flight transaction first. Calling this
    /// on a closed network does nothing.
    pub async fn shutdown(&self) -> EuroResult<ShutdownOutcome> {
        const OP: &str = "shutdown";
        let mut guard = self.bus.lock().await;

        let Some(bus) = guard.as_mut() else {
            tracing::debug!(port = %self.port.display(), "Network already closed");
            return Ok(ShutdownOutcome {
                already_closed: true,
                ..ShutdownOutcome::default()
            });
        };

        let mut outcome = ShutdownOutcome::default();
        let manual = ControlMode::Manual.register_value();

        for id in self.connected_ids() {
            for loop_id in LoopId::ALL {
                let mode = write_register(
                    bus,
                    &self.stats,
                    id,
                    address(loop_id, RegisterField::ManAutoFlag),
                    manual,
                )
                .await;
                let result = match mode {
                    Ok(()) => {
                        write_register(bus, &self.stats, id, address(loop_id, RegisterField::TargetOp), 0)
                            .await
                    }
                    Err(e) => Err(e),
                };

                match result {
                    Ok(()) => outcome.loops_zeroed += 1,
                    Err(e) => {
                        outcome.failures += 1;
                        self.report(Origin::ConnectionManager, OP, &e);
                    }
                }
            }
        }

        let closed = bus.disconnect().await;
        *guard = None;

        tracing::info!(
            port = %self.port.display(),
            loops_zeroed = outcome.loops_zeroed,
            failures = outcome.failures,
            "Network shut down"
        );

        closed.map(|()| outcome)
    }

    /// Closes the bus without touching any loop. Returns `false` if the
    /// network was already closed.
    ///
    /// Loops keep their last commanded mode and value.
    pub async fn release(&self) -> EuroResult<bool> {
        let mut guard = self.bus.lock().await;
        let Some(mut bus) = guard.take() else {
            return Ok(false);
        };

        tracing::info!(port = %self.port.display(), "Releasing network without fail-safe writes");
        bus.disconnect().await.map(|()| true)
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Returns `true` until the network is shut down.
    pub async fn is_open(&self) -> bool {
        self.bus.lock().await.is_some()
    }

    /// Returns the IDs of connected controllers in slot order.
    pub fn connected_ids(&self) -> Vec<u8> {
        self.ids
            .iter()
            .zip(self.connected.iter())
            .filter(|(_, connected)| **connected)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Returns the slave ID held in each slot (0 when empty).
    pub fn slot_ids(&self) -> [u8; MAX_CONTROLLERS] {
        self.ids
    }

    /// Returns the connected flag of each slot.
    pub fn connected_flags(&self) -> [bool; MAX_CONTROLLERS] {
        self.connected
    }

    /// Returns `true` if `id` answered the last probe.
    pub fn is_connected(&self, id: u8) -> bool {
        self.ids
            .iter()
            .zip(self.connected.iter())
            .any(|(slot, connected)| *connected && *slot == id)
    }

    /// Returns the serial port path.
    pub fn port(&self) -> &Path {
        &self.port
    }

    /// Returns the transport's display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the register calibration.
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Returns the command limits.
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Returns the bus request counters.
    pub fn stats(&self) -> &BusStats {
        &self.stats
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    pub(crate) fn report(&self, origin: Origin, operation: &'static str, error: &EuroError) {
        self.reporter.report(FailureReport::new(origin, operation, error));
    }

    pub(crate) fn reported<V>(
        &self,
        origin: Origin,
        operation: &'static str,
        result: EuroResult<V>,
    ) -> EuroResult<V> {
        if let Err(e) = &result {
            self.report(origin, operation, e);
        }
        result
    }
}

impl<T: BusTransport> Drop for EuroNetwork<T> {
    fn drop(&mut self) {
        if self.bus.get_mut().is_some() {
            tracing::warn!(
                port = %self.port.display(),
                "Network dropped without shutdown; outputs were not zeroed"
            );
        }
    }
}

impl<T: BusTransport> std::fmt::Debug for EuroNetwork<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EuroNetwork")
            .field("port", &self.port)
            .field("ids", &self.ids)
            .field("connected", &self.connected)
            .field("calibration", &self.calibration)
            .field("limits", &self.limits)
            .finish()
    }
}

// =============================================================================
// Timed bus access
// =============================================================================

pub(crate) async fn read_registers<T: BusTransport>(
    bus: &mut T,
    stats: &BusStats,
    slave: u8,
    address: u16,
    count: u16,
) -> EuroResult<Vec<u16>> {
    let started = Instant::now();
    match bus.read_holding_registers(slave, address, count).await {
        Ok(values) => {
            stats.record_read(started.elapsed());
            Ok(values)
        }
        Err(e) => {
            stats.record_error(&e);
            Err(e)
        }
    }
}

pub(crate) async fn read_register<T: BusTransport>(
    bus: &mut T,
    stats: &BusStats,
    slave: u8,
    address: u16,
) -> EuroResult<u16> {
    let values = read_registers(bus, stats, slave, address, 1).await?;
    values.first().copied().ok_or_else(|| {
        IoError::ShortResponse {
            slave,
            address,
            expected: 1,
            actual: 0,
        }
        .into()
    })
}

pub(crate) async fn write_register<T: BusTransport>(
    bus: &mut T,
    stats: &BusStats,
    slave: u8,
    address: u16,
    value: u16,
) -> EuroResult<()> {
    let started = Instant::now();
    tracing::trace!(slave, address, value, "Writing register");
    match bus.write_single_register(slave, address, value).await {
        Ok(()) => {
            stats.record_write(started.elapsed());
            Ok(())
        }
        Err(e) => {
            stats.record_error(&e);
            Err(e)
        }
    }
}

// =============================================================================
// ConnectionManager
// =============================================================================

/// Finds a serial port with responding controllers.
pub struct ConnectionManager<O: BusOpener> {
    opener: O,
    settings: BusSettings,
    devices: DeviceDirectory,
    calibration: Calibration,
    limits: Limits,
    reporter: Arc<dyn ErrorReporter>,
}

impl ConnectionManager<RtuOpener> {
    /// Creates a manager opening real serial ports.
    pub fn rtu(settings: BusSettings) -> Self {
        Self::new(RtuOpener, settings)
    }
}

impl<O: BusOpener> ConnectionManager<O> {
    /// Creates a manager using `opener` for candidate ports.
    pub fn new(opener: O, settings: BusSettings) -> Self {
        let devices = DeviceDirectory::new(settings.device_dir.clone());
        Self {
            opener,
            settings,
            devices,
            calibration: Calibration::default(),
            limits: Limits::default(),
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Sets the calibration given to discovered networks.
    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }

    /// Sets the limits given to discovered networks.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Sets the failure reporter shared with discovered networks.
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Returns the line settings.
    pub fn settings(&self) -> &BusSettings {
        &self.settings
    }

    /// Discovers controllers on ports of the configured kind.
    pub async fn discover_configured(&self, ids: RangeInclusive<u8>) -> EuroResult<EuroNetwork<O::Transport>> {
        self.discover(self.settings.port_kind, ids).await
    }

    /// Opens each candidate port of `kind` in directory order and probes
    /// `ids` on it. Returns the network of the first port with at least
    /// one responder; every other opened port is closed again.
    ///
    /// # Errors
    ///
    /// - [`InvalidArgument`](crate::error::InvalidArgument) for a bad ID range
    /// - [`ConnectionError::NoMatchingPort`] if no device name matches `kind`
    /// - [`ConnectionError::NoResponder`] if no controller answered on any port
    /// - the last open failure if no candidate port could be opened
    pub async fn discover(
        &self,
        kind: SerialPortKind,
        ids: RangeInclusive<u8>,
    ) -> EuroResult<EuroNetwork<O::Transport>> {
        let result = self.try_discover(kind, ids).await;
        if let Err(e) = &result {
            self.reporter
                .report(FailureReport::new(Origin::ConnectionManager, "discover", e));
        }
        result
    }

    async fn try_discover(
        &self,
        kind: SerialPortKind,
        ids: RangeInclusive<u8>,
    ) -> EuroResult<EuroNetwork<O::Transport>> {
        let (start, end) = (*ids.start(), *ids.end());
        validate_id_range(start, end)?;

        let mut candidates = 0;
        let mut probed = 0;
        let mut last_open_error = None;

        for path in self.devices.candidate_paths(kind)? {
            candidates += 1;

            let transport = match self.opener.open(&path, &self.settings).await {
                Ok(transport) => transport,
                Err(e) => {
                    tracing::debug!(port = %path.display(), error = %e, "Skipping candidate port");
                    last_open_error = Some(e);
                    continue;
                }
            };
            probed += 1;

            let mut network = EuroNetwork::new(transport, path.clone())
                .with_calibration(self.calibration)
                .with_limits(self.limits)
                .with_reporter(Arc::clone(&self.reporter));

            match network.probe(ids.clone()).await {
                Ok(count) => {
                    tracing::info!(
                        port = %path.display(),
                        controllers = count,
                        "Discovered controller network"
                    );
                    return Ok(network);
                }
                Err(e) => {
                    tracing::debug!(port = %path.display(), error = %e, "No controllers on port");
                    if let Err(close_error) = network.shutdown().await {
                        tracing::warn!(port = %path.display(), error = %close_error, "Failed to close port");
                    }
                }
            }
        }

        if candidates == 0 {
            return Err(ConnectionError::NoMatchingPort {
                dir: self.devices.path().to_path_buf(),
                prefix: kind.prefix().to_string(),
            }
            .into());
        }

        match (probed, last_open_error) {
            (0, Some(e)) => Err(e),
            _ => Err(ConnectionError::NoResponder {
                start,
                end,
                ports: probed,
            }
            .into()),
        }
    }
}

impl<O: BusOpener> std::fmt::Debug for ConnectionManager<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("devices", &self.devices)
            .field("line", &self.settings.line_notation())
            .field("port_kind", &self.settings.port_kind)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
