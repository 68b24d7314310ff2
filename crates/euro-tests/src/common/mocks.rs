// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! In-memory stand-ins for the serial line.
//!
//! [`MockBus`] is a cheap cloneable handle: the clone moved into an
//! [`EuroNetwork`](euro_modbus::EuroNetwork) and the clone kept by the test
//! share one register store, so the test can script responses and inspect
//! every write after the fact.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use euro_modbus::{
    BusOpener, BusSettings, BusTransport, ConnectionError, EuroError, EuroResult, IoError,
};

/// Modbus exception code used for injected write failures.
pub const SLAVE_DEVICE_FAILURE: u8 = 0x04;

// =============================================================================
// MockBus
// =============================================================================

/// One recorded register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRecord {
    /// Slave ID.
    pub slave: u8,
    /// Register address.
    pub address: u16,
    /// Value written.
    pub value: u16,
}

#[derive(Debug, Default)]
struct MockState {
    responders: Mutex<HashSet<u8>>,
    registers: Mutex<HashMap<(u8, u16), u16>>,
    failing_reads: Mutex<HashSet<u16>>,
    failing_writes: Mutex<HashSet<u16>>,
    write_history: Mutex<Vec<WriteRecord>>,
    latency: Mutex<Duration>,
    fail_next_write: AtomicBool,
    fail_disconnect: AtomicBool,
    closed: AtomicBool,
    in_flight: AtomicBool,
    overlaps: AtomicU64,
    read_count: AtomicU64,
    write_count: AtomicU64,
    disconnect_count: AtomicU64,
}

/// A scriptable Modbus line.
///
/// Unknown slaves time out. Registers that were never written read as 0.
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Arc<MockState>,
    name: String,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockBus {
    /// Creates a line with no responding slaves.
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            name: "mock".to_string(),
        }
    }

    /// Creates a line on which `ids` answer.
    pub fn with_responders(ids: impl IntoIterator<Item = u8>) -> Self {
        let bus = Self::new();
        bus.add_responders(ids);
        bus
    }

    /// Sets the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Makes `ids` answer requests.
    pub fn add_responders(&self, ids: impl IntoIterator<Item = u8>) {
        lock(&self.state.responders).extend(ids);
    }

    /// Stores a register value.
    pub fn set_register(&self, slave: u8, address: u16, value: u16) {
        lock(&self.state.registers).insert((slave, address), value);
    }

    /// Returns a register value, if one was stored or written.
    pub fn register(&self, slave: u8, address: u16) -> Option<u16> {
        lock(&self.state.registers).get(&(slave, address)).copied()
    }

    /// Makes every read of `address` fail with a timeout.
    pub fn fail_reads_at(&self, address: u16) {
        lock(&self.state.failing_reads).insert(address);
    }

    /// Makes every write to `address` fail with an exception response.
    pub fn fail_writes_at(&self, address: u16) {
        lock(&self.state.failing_writes).insert(address);
    }

    /// Makes the next write fail with an exception response.
    pub fn fail_next_write(&self) {
        self.state.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Makes `disconnect` fail.
    pub fn fail_disconnect(&self, fail: bool) {
        self.state.fail_disconnect.store(fail, Ordering::SeqCst);
    }

    /// Delays every request by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.state.latency) = latency;
    }

    /// Returns every write in order.
    pub fn write_history(&self) -> Vec<WriteRecord> {
        lock(&self.state.write_history).clone()
    }

    /// Returns the writes addressed to `address`.
    pub fn writes_to(&self, address: u16) -> Vec<WriteRecord> {
        self.write_history()
            .into_iter()
            .filter(|w| w.address == address)
            .collect()
    }

    /// Returns the number of read requests.
    pub fn read_count(&self) -> u64 {
        self.state.read_count.load(Ordering::SeqCst)
    }

    /// Returns the number of successful writes.
    pub fn write_count(&self) -> u64 {
        self.state.write_count.load(Ordering::SeqCst)
    }

    /// Returns how often the line was closed.
    pub fn disconnect_count(&self) -> u64 {
        self.state.disconnect_count.load(Ordering::SeqCst)
    }

    /// Returns `true` once the line was closed.
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Returns how many requests started while another was in flight.
    pub fn overlapping_requests(&self) -> u64 {
        self.state.overlaps.load(Ordering::SeqCst)
    }

    /// Clears counters and history, keeping responders and registers.
    pub fn reset_counters(&self) {
        self.state.read_count.store(0, Ordering::SeqCst);
        self.state.write_count.store(0, Ordering::SeqCst);
        self.state.disconnect_count.store(0, Ordering::SeqCst);
        lock(&self.state.write_history).clear();
    }

    fn responds(&self, slave: u8) -> bool {
        lock(&self.state.responders).contains(&slave)
    }

    fn ensure_open(&self, operation: &'static str) -> EuroResult<()> {
        if self.is_closed() {
            return Err(IoError::Transport {
                operation,
                source: std::io::Error::new(std::io::ErrorKind::NotConnected, "line closed"),
            }
            .into());
        }
        Ok(())
    }

    async fn transaction(&self) -> InFlight<'_> {
        if self.state.in_flight.swap(true, Ordering::SeqCst) {
            self.state.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        let latency = *lock(&self.state.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        InFlight(&self.state)
    }
}

struct InFlight<'a>(&'a MockState);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl BusTransport for MockBus {
    async fn read_holding_registers(
        &mut self,
        slave: u8,
        address: u16,
        count: u16,
    ) -> EuroResult<Vec<u16>> {
        const OP: &str = "read_holding_registers";
        self.ensure_open(OP)?;
        let _flight = self.transaction().await;
        self.state.read_count.fetch_add(1, Ordering::SeqCst);

        if !self.responds(slave) || lock(&self.state.failing_reads).contains(&address) {
            return Err(EuroError::timeout(OP, slave, address, Duration::from_millis(50)));
        }

        let registers = lock(&self.state.registers);
        Ok((0..count)
            .map(|offset| {
                registers
                    .get(&(slave, address.wrapping_add(offset)))
                    .copied()
                    .unwrap_or(0)
            })
            .collect())
    }

    async fn write_single_register(&mut self, slave: u8, address: u16, value: u16) -> EuroResult<()> {
        const OP: &str = "write_single_register";
        self.ensure_open(OP)?;
        let _flight = self.transaction().await;

        if !self.responds(slave) {
            return Err(EuroError::timeout(OP, slave, address, Duration::from_millis(50)));
        }

        let injected = self.state.fail_next_write.swap(false, Ordering::SeqCst)
            || lock(&self.state.failing_writes).contains(&address);
        if injected {
            return Err(IoError::Exception {
                operation: OP,
                slave,
                address,
                code: SLAVE_DEVICE_FAILURE,
                name: IoError::exception_name(SLAVE_DEVICE_FAILURE),
            }
            .into());
        }

        lock(&self.state.registers).insert((slave, address), value);
        lock(&self.state.write_history).push(WriteRecord {
            slave,
            address,
            value,
        });
        self.state.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) -> EuroResult<()> {
        self.state.disconnect_count.fetch_add(1, Ordering::SeqCst);
        self.state.closed.store(true, Ordering::SeqCst);

        if self.state.fail_disconnect.load(Ordering::SeqCst) {
            return Err(IoError::Transport {
                operation: "disconnect",
                source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "flush failed"),
            }
            .into());
        }
        Ok(())
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

// =============================================================================
// MockOpener
// =============================================================================

/// Hands out [`MockBus`] lines by device file name.
///
/// Paths without a registered line open an empty line; paths marked with
/// [`MockOpener::fail_open`] fail like a missing device.
#[derive(Debug, Clone, Default)]
pub struct MockOpener {
    lines: Arc<Mutex<HashMap<String, MockBus>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    opened: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockOpener {
    /// Creates an opener with no registered lines.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the line returned for device `name`.
    pub fn with_line(self, name: impl Into<String>, bus: MockBus) -> Self {
        lock(&self.lines).insert(name.into(), bus);
        self
    }

    /// Makes opening device `name` fail.
    pub fn fail_open(self, name: impl Into<String>) -> Self {
        lock(&self.failing).insert(name.into());
        self
    }

    /// Returns the line registered or created for `name`.
    pub fn line(&self, name: &str) -> Option<MockBus> {
        lock(&self.lines).get(name).cloned()
    }

    /// Returns every path opened, in order.
    pub fn opened(&self) -> Vec<PathBuf> {
        lock(&self.opened).clone()
    }
}

#[async_trait]
impl BusOpener for MockOpener {
    type Transport = MockBus;

    async fn open(&self, path: &Path, _settings: &BusSettings) -> EuroResult<MockBus> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if lock(&self.failing).contains(&name) {
            return Err(ConnectionError::serial_not_found(path.display().to_string()).into());
        }

        lock(&self.opened).push(path.to_path_buf());
        let bus = lock(&self.lines)
            .entry(name.clone())
            .or_insert_with(MockBus::new)
            .clone();
        Ok(bus.named(name))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_bus_shared_state() {
        let bus = MockBus::with_responders([1]);
        let mut transport = bus.clone();

        transport.write_single_register(1, 10, 42).await.unwrap();
        assert_eq!(bus.register(1, 10), Some(42));
        assert_eq!(bus.write_count(), 1);

        let values = transport.read_holding_registers(1, 10, 2).await.unwrap();
        assert_eq!(values, vec![42, 0]);
    }

    #[tokio::test]
    async fn test_silent_slave_times_out() {
        let mut bus = MockBus::with_responders([1]);
        let error = bus.read_holding_registers(2, 1, 1).await.unwrap_err();
        assert!(matches!(error, EuroError::Io(IoError::Timeout { slave: 2, .. })));
    }

    #[tokio::test]
    async fn test_injected_write_failure() {
        let mut bus = MockBus::with_responders([1]);
        bus.fail_next_write();

        assert!(bus.write_single_register(1, 5, 1).await.is_err());
        assert!(bus.write_single_register(1, 5, 1).await.is_ok());
        assert_eq!(bus.write_history().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_line_rejects_requests() {
        let mut bus = MockBus::with_responders([1]);
        bus.disconnect().await.unwrap();

        assert!(bus.is_closed());
        assert!(bus.read_holding_registers(1, 1, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_opener_failures() {
        let opener = MockOpener::new().fail_open("ttyUSB0");
        let settings = BusSettings::default();

        assert!(opener.open(Path::new("/dev/ttyUSB0"), &settings).await.is_err());
        assert!(opener.open(Path::new("/dev/ttyUSB1"), &settings).await.is_ok());
        assert_eq!(opener.opened(), vec![PathBuf::from("/dev/ttyUSB1")]);
        assert!(opener.line("ttyUSB1").is_some());
    }
}
