// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus RTU transport over a serial port.
//!
//! Uses `tokio-serial` for the line and `tokio-modbus` for RTU framing and
//! CRC. One context serves every controller on the line; the slave address
//! is switched per request.
//!
//! # Example
//!
//! ```rust,ignore
//! use euro_modbus::client::RtuBus;
//! use euro_modbus::types::BusSettings;
//!
//! let mut bus = RtuBus::open("/dev/ttyUSB0", &BusSettings::default())?;
//! let pv = bus.read_holding_registers(1, 1, 1).await?;
//! ```

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tokio_modbus::client::Context as ModbusContext;
use tokio_modbus::prelude::*;
use tokio_modbus::{Error as TokioModbusError, ExceptionCode};
use tokio_serial::{
    DataBits as SerialDataBits, Parity as SerialParity, SerialPortBuilderExt,
    StopBits as SerialStopBits,
};

use crate::error::{ConnectionError, EuroError, EuroResult, IoError};
use crate::types::{BusSettings, DataBits, Parity, StopBits};

use super::transport::{BusOpener, BusTransport};

// =============================================================================
// RtuBus
// =============================================================================

/// Modbus RTU master on one serial port.
pub struct RtuBus {
    /// Device path.
    port: String,
    /// Line settings.
    settings: BusSettings,
    /// The tokio-modbus context; `None` once disconnected.
    context: Option<ModbusContext>,
}

impl RtuBus {
    /// Opens `path` with the given line settings and attaches an RTU context.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionError`] if the port is missing, inaccessible
    /// or rejects the line settings.
    pub fn open(path: impl AsRef<Path>, settings: &BusSettings) -> EuroResult<Self> {
        let port = path.as_ref().to_string_lossy().into_owned();

        let builder = tokio_serial::new(port.as_str(), settings.baud_rate)
            .data_bits(Self::convert_data_bits(settings.data_bits))
            .parity(Self::convert_parity(settings.parity))
            .stop_bits(Self::convert_stop_bits(settings.stop_bits));

        let serial = builder
            .open_native_async()
            .map_err(|e| Self::map_open_error(&port, e))?;

        let context = rtu::attach(serial);

        tracing::info!(
            port = %port,
            line = %settings.line_notation(),
            timeout_ms = settings.response_timeout.as_millis() as u64,
            "Opened Modbus RTU bus"
        );

        Ok(Self {
            port,
            settings: settings.clone(),
            context: Some(context),
        })
    }

    /// Returns the serial port path.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Returns the line settings.
    pub fn settings(&self) -> &BusSettings {
        &self.settings
    }

    /// Returns `true` until the bus is disconnected.
    pub fn is_open(&self) -> bool {
        self.context.is_some()
    }

    fn convert_data_bits(bits: DataBits) -> SerialDataBits {
        match bits {
            DataBits::Seven => SerialDataBits::Seven,
            DataBits::Eight => SerialDataBits::Eight,
        }
    }

    fn convert_parity(parity: Parity) -> SerialParity {
        match parity {
            Parity::None => SerialParity::None,
            Parity::Odd => SerialParity::Odd,
            Parity::Even => SerialParity::Even,
        }
    }

    fn convert_stop_bits(bits: StopBits) -> SerialStopBits {
        match bits {
            StopBits::One => SerialStopBits::One,
            StopBits::Two => SerialStopBits::Two,
        }
    }

    fn map_open_error(port: &str, e: tokio_serial::Error) -> EuroError {
        let error = match e.kind {
            tokio_serial::ErrorKind::NoDevice => ConnectionError::serial_not_found(port),
            tokio_serial::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
                ConnectionError::serial_access_denied(port)
            }
            tokio_serial::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                ConnectionError::serial_not_found(port)
            }
            _ => ConnectionError::SerialConfigurationFailed {
                port: port.to_string(),
                message: e.to_string(),
            },
        };
        error.into()
    }

    /// Maps a tokio-modbus error to an [`IoError`].
    fn map_modbus_error(
        error: TokioModbusError,
        operation: &'static str,
        slave: u8,
        address: u16,
        after: Duration,
    ) -> EuroError {
        match error {
            TokioModbusError::Transport(source) if source.kind() == std::io::ErrorKind::TimedOut => {
                EuroError::timeout(operation, slave, address, after)
            }
            TokioModbusError::Transport(source) => IoError::Transport { operation, source }.into(),
            TokioModbusError::Protocol(protocol_error) => IoError::Protocol {
                operation,
                slave,
                message: protocol_error.to_string(),
            }
            .into(),
        }
    }

    fn exception_code_to_u8(code: &ExceptionCode) -> u8 {
        match code {
            ExceptionCode::IllegalFunction => 0x01,
            ExceptionCode::IllegalDataAddress => 0x02,
            ExceptionCode::IllegalDataValue => 0x03,
            ExceptionCode::ServerDeviceFailure => 0x04,
            ExceptionCode::Acknowledge => 0x05,
            ExceptionCode::ServerDeviceBusy => 0x06,
            ExceptionCode::MemoryParityError => 0x08,
            ExceptionCode::GatewayPathUnavailable => 0x0A,
            ExceptionCode::GatewayTargetDevice => 0x0B,
            _ => 0xFF,
        }
    }

    fn map_exception(
        exception: ExceptionCode,
        operation: &'static str,
        slave: u8,
        address: u16,
    ) -> EuroError {
        let code = Self::exception_code_to_u8(&exception);
        IoError::Exception {
            operation,
            slave,
            address,
            code,
            name: IoError::exception_name(code),
        }
        .into()
    }
}

#[async_trait]
impl BusTransport for RtuBus {
    async fn read_holding_registers(
        &mut self,
        slave: u8,
        address: u16,
        count: u16,
    ) -> EuroResult<Vec<u16>> {
        const OP: &str = "read_holding_registers";
        let after = self.settings.response_timeout;
        let ctx = self.context.as_mut().ok_or_else(EuroError::network_closed)?;
        ctx.set_slave(Slave(slave));

        let registers = timeout(after, ctx.read_holding_registers(address, count))
            .await
            .map_err(|_| EuroError::timeout(OP, slave, address, after))?
            .map_err(|e| Self::map_modbus_error(e, OP, slave, address, after))?
            .map_err(|e| Self::map_exception(e, OP, slave, address))?;

        if registers.len() < count as usize {
            return Err(IoError::ShortResponse {
                slave,
                address,
                expected: count as usize,
                actual: registers.len(),
            }
            .into());
        }

        Ok(registers)
    }

    async fn write_single_register(&mut self, slave: u8, address: u16, value: u16) -> EuroResult<()> {
        const OP: &str = "write_single_register";
        let after = self.settings.response_timeout;
        let ctx = self.context.as_mut().ok_or_else(EuroError::network_closed)?;
        ctx.set_slave(Slave(slave));

        timeout(after, ctx.write_single_register(address, value))
            .await
            .map_err(|_| EuroError::timeout(OP, slave, address, after))?
            .map_err(|e| Self::map_modbus_error(e, OP, slave, address, after))?
            .map_err(|e| Self::map_exception(e, OP, slave, address))?;

        Ok(())
    }

    async fn disconnect(&mut self) -> EuroResult<()> {
        if let Some(mut ctx) = self.context.take() {
            if let Err(e) = ctx.disconnect().await {
                tracing::warn!(port = %self.port, error = %e, "Error closing Modbus RTU bus");
            }
            tracing::debug!(port = %self.port, "Closed Modbus RTU bus");
        }
        Ok(())
    }

    fn display_name(&self) -> String {
        format!(
            "Modbus RTU {} @{}",
            self.port,
            self.settings.line_notation()
        )
    }
}

impl std::fmt::Debug for RtuBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtuBus")
            .field("port", &self.port)
            .field("line", &self.settings.line_notation())
            .field("open", &self.is_open())
            .finish()
    }
}

// =============================================================================
// RtuOpener
// =============================================================================

/// Opens [`RtuBus`] transports on real serial devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct RtuOpener;

#[async_trait]
impl BusOpener for RtuOpener {
    type Transport = RtuBus;

    async fn open(&self, path: &Path, settings: &BusSettings) -> EuroResult<RtuBus> {
        RtuBus::open(path, settings)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_data_bits_conversion() {
        assert!(matches!(
            RtuBus::convert_data_bits(DataBits::Eight),
            SerialDataBits::Eight
        ));
        assert!(matches!(
            RtuBus::convert_data_bits(DataBits::Seven),
            SerialDataBits::Seven
        ));
    }

    #[test]
    fn test_parity_conversion() {
        assert!(matches!(RtuBus::convert_parity(Parity::None), SerialParity::None));
        assert!(matches!(RtuBus::convert_parity(Parity::Even), SerialParity::Even));
        assert!(matches!(RtuBus::convert_parity(Parity::Odd), SerialParity::Odd));
    }

    #[test]
    fn test_stop_bits_conversion() {
        assert!(matches!(RtuBus::convert_stop_bits(StopBits::One), SerialStopBits::One));
        assert!(matches!(RtuBus::convert_stop_bits(StopBits::Two), SerialStopBits::Two));
    }

    #[test]
    fn test_exception_mapping() {
        let error = RtuBus::map_exception(ExceptionCode::IllegalDataAddress, "read", 2, 1025);
        match error {
            EuroError::Io(IoError::Exception { code, name, slave, .. }) => {
                assert_eq!(code, 0x02);
                assert_eq!(name, "Illegal Data Address");
                assert_eq!(slave, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_transport_timeout_maps_to_timeout() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "no reply");
        let error = RtuBus::map_modbus_error(
            TokioModbusError::Transport(io),
            "write",
            1,
            274,
            Duration::from_millis(50),
        );
        assert!(matches!(error, EuroError::Io(IoError::Timeout { slave: 1, address: 274, .. })));
    }

    #[test]
    fn test_transport_failure_maps_to_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged");
        let error = RtuBus::map_modbus_error(
            TokioModbusError::Transport(io),
            "read",
            1,
            1,
            Duration::from_millis(50),
        );
        assert_eq!(error.kind(), ErrorKind::Io);
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn test_open_missing_port() {
        let error = RtuBus::open("/dev/ttyUSB_does_not_exist", &BusSettings::default()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Connection);
    }
}
