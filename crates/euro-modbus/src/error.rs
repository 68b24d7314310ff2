// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the Eurotherm communication subsystem.
//!
//! Every fallible operation returns [`EuroResult`]. Errors are grouped into
//! the four kinds callers branch on:
//!
//! ```text
//! EuroError
//! ├── Range           - input outside a field's legal physical range
//! ├── InvalidArgument - closed network, broadcast ID, untracked controller
//! ├── Io              - register read/write failure or response timeout
//! └── Connection      - no port or no responding slave during discovery
//! ```
//!
//! # Examples
//!
//! ```
//! use euro_modbus::error::{EuroError, ErrorKind, RangeError};
//!
//! let error = EuroError::from(RangeError::out_of_range("output power", 100.1, 0.0, 100.0));
//! assert_eq!(error.kind(), ErrorKind::Range);
//! assert!(!error.is_retryable());
//! ```

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::Level;

// =============================================================================
// EuroError - Main Error Type
// =============================================================================

/// The main error type for controller communication.
#[derive(Debug, Error)]
pub enum EuroError {
    /// A value outside its legal physical range.
    #[error("{0}")]
    Range(#[from] RangeError),

    /// An argument or handle that cannot be used.
    #[error("{0}")]
    InvalidArgument(#[from] InvalidArgument),

    /// A transport read, write or timeout failure.
    #[error("{0}")]
    Io(#[from] IoError),

    /// Discovery found no usable port or controller.
    #[error("{0}")]
    Connection(#[from] ConnectionError),
}

/// The error kind, independent of the detailed variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`RangeError`].
    Range,
    /// See [`InvalidArgument`].
    InvalidArgument,
    /// See [`IoError`].
    Io,
    /// See [`ConnectionError`].
    Connection,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Range => "RangeError",
            Self::InvalidArgument => "InvalidArgument",
            Self::Io => "IoError",
            Self::Connection => "ConnectionError",
        };
        f.write_str(s)
    }
}

impl EuroError {
    // =========================================================================
    // Convenience Factory Methods
    // =========================================================================

    /// Creates an error for an operation against a closed network.
    pub fn network_closed() -> Self {
        Self::InvalidArgument(InvalidArgument::NetworkClosed)
    }

    /// Creates an error for a controller that is not connected on the network.
    pub fn unknown_controller(id: u8) -> Self {
        Self::InvalidArgument(InvalidArgument::UnknownController { id })
    }

    /// Creates a response timeout error.
    pub fn timeout(operation: &'static str, slave: u8, address: u16, duration: Duration) -> Self {
        Self::Io(IoError::Timeout {
            operation,
            slave,
            address,
            duration,
        })
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Range(_) => ErrorKind::Range,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Io(_) => ErrorKind::Io,
            Self::Connection(_) => ErrorKind::Connection,
        }
    }

    /// Returns `true` if repeating the same call may succeed.
    ///
    /// Validation failures never are; bus failures usually are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Range(_) | Self::InvalidArgument(_) => false,
            Self::Io(e) => e.is_retryable(),
            Self::Connection(e) => e.is_retryable(),
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Range(_) => ErrorSeverity::Warning,
            Self::InvalidArgument(_) => ErrorSeverity::Error,
            Self::Io(e) => e.severity(),
            Self::Connection(e) => e.severity(),
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Range(_) => "range",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Io(_) => "io",
            Self::Connection(_) => "connection",
        }
    }

    /// Returns a structured error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Range(e) => e.error_code(),
            Self::InvalidArgument(e) => e.error_code(),
            Self::Io(e) => e.error_code(),
            Self::Connection(e) => e.error_code(),
        }
    }

    /// Returns recovery hints for an operator.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::Range(_) => vec!["Check the requested value against the loop limits"],
            Self::InvalidArgument(e) => e.recovery_hints(),
            Self::Io(e) => e.recovery_hints(),
            Self::Connection(e) => e.recovery_hints(),
        }
    }

    /// Returns the tracing level for this error.
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let code = self.error_code();

        match self.tracing_level() {
            Level::ERROR => tracing::error!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
        }
    }
}

// =============================================================================
// RangeError
// =============================================================================

/// Values rejected before any bus traffic.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RangeError {
    /// Requested value is outside the legal range for the quantity.
    #[error("{quantity} {value} outside legal range [{min}, {max}]")]
    OutOfRange {
        /// The physical quantity being set.
        quantity: &'static str,
        /// Requested value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },

    /// Scaled value does not fit a 16-bit register.
    #[error("value {value} at resolution {resolution} does not fit a 16-bit register")]
    EncodingOverflow {
        /// Unscaled value.
        value: f64,
        /// Decimal resolution used for scaling.
        resolution: u8,
    },
}

impl RangeError {
    /// Creates an out-of-range error.
    pub fn out_of_range(quantity: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            quantity,
            value,
            min,
            max,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::OutOfRange { .. } => ErrorCode::new(1, 1),
            Self::EncodingOverflow { .. } => ErrorCode::new(1, 2),
        }
    }
}

// =============================================================================
// InvalidArgument
// =============================================================================

/// Arguments or handles that cannot be used.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidArgument {
    /// The network's bus context has been closed.
    #[error("Network is not open")]
    NetworkClosed,

    /// Slave ID 0 is reserved for broadcast and never answers.
    #[error("Slave ID 0 is the broadcast address and cannot be probed")]
    BroadcastId,

    /// The probe range contains no IDs.
    #[error("Slave ID range {start}..={end} is empty")]
    EmptyIdRange {
        /// First ID.
        start: u8,
        /// Last ID.
        end: u8,
    },

    /// Controller ID is not connected on this network.
    #[error("Controller {id} is not connected on this network")]
    UnknownController {
        /// Slave ID.
        id: u8,
    },

    /// Snapshot table does not track the controller.
    #[error("No snapshot is tracked for controller {id}")]
    UntrackedSnapshot {
        /// Slave ID.
        id: u8,
    },
}

impl InvalidArgument {
    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NetworkClosed => ErrorCode::new(2, 1),
            Self::BroadcastId => ErrorCode::new(2, 2),
            Self::EmptyIdRange { .. } => ErrorCode::new(2, 3),
            Self::UnknownController { .. } => ErrorCode::new(2, 4),
            Self::UntrackedSnapshot { .. } => ErrorCode::new(2, 5),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::NetworkClosed => vec!["Run discovery again to reopen the bus"],
            Self::BroadcastId | Self::EmptyIdRange { .. } => {
                vec!["Use a slave ID range within 1-247"]
            }
            Self::UnknownController { .. } | Self::UntrackedSnapshot { .. } => vec![
                "Check the controller's comms address",
                "Widen the probed ID range and rediscover",
            ],
        }
    }
}

// =============================================================================
// IoError
// =============================================================================

/// Transport-level failures on an open bus.
#[derive(Debug, Error)]
pub enum IoError {
    /// No response within the configured timeout.
    #[error("{operation} on slave {slave} register {address} timed out after {duration:?}")]
    Timeout {
        /// Operation name.
        operation: &'static str,
        /// Slave ID.
        slave: u8,
        /// Register address.
        address: u16,
        /// Timeout that elapsed.
        duration: Duration,
    },

    /// The controller answered with a Modbus exception.
    #[error("Slave {slave} rejected {operation} at register {address}: {name} (0x{code:02X})")]
    Exception {
        /// Operation name.
        operation: &'static str,
        /// Slave ID.
        slave: u8,
        /// Register address.
        address: u16,
        /// Exception code.
        code: u8,
        /// Exception name.
        name: &'static str,
    },

    /// Framing or CRC problem reported by the RTU codec.
    #[error("Protocol error during {operation} on slave {slave}: {message}")]
    Protocol {
        /// Operation name.
        operation: &'static str,
        /// Slave ID.
        slave: u8,
        /// Codec message.
        message: String,
    },

    /// Underlying serial I/O failure.
    #[error("Serial I/O error during {operation}: {source}")]
    Transport {
        /// Operation name.
        operation: &'static str,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A register held a value outside its documented encoding.
    #[error("Slave {slave} register {address} holds unexpected value {raw}")]
    UnexpectedValue {
        /// Slave ID.
        slave: u8,
        /// Register address.
        address: u16,
        /// Raw register content.
        raw: u16,
    },

    /// The device returned fewer registers than requested.
    #[error("Slave {slave} returned {actual} registers at {address}, expected {expected}")]
    ShortResponse {
        /// Slave ID.
        slave: u8,
        /// Register address.
        address: u16,
        /// Expected count.
        expected: usize,
        /// Actual count.
        actual: usize,
    },

    /// A snapshot could not be written to its sink.
    #[error("Snapshot sink write failed: {source}")]
    Sink {
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// One or more snapshot reads failed.
    #[error("{failed} of {attempted} snapshot reads failed; first: {first}")]
    Poll {
        /// Failed read count.
        failed: usize,
        /// Attempted read count.
        attempted: usize,
        /// Message of the first failure.
        first: String,
    },
}

impl IoError {
    /// Returns the exception name for a Modbus exception code.
    pub fn exception_name(code: u8) -> &'static str {
        match code {
            0x01 => "Illegal Function",
            0x02 => "Illegal Data Address",
            0x03 => "Illegal Data Value",
            0x04 => "Slave Device Failure",
            0x05 => "Acknowledge",
            0x06 => "Slave Device Busy",
            0x08 => "Memory Parity Error",
            0x0A => "Gateway Path Unavailable",
            0x0B => "Gateway Target Device Failed to Respond",
            _ => "Unknown Exception",
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Protocol { .. } | Self::Transport { .. } => true,
            Self::Poll { .. } | Self::ShortResponse { .. } | Self::Sink { .. } => true,
            Self::Exception { code, .. } => matches!(code, 0x05 | 0x06),
            Self::UnexpectedValue { .. } => false,
        }
    }

    /// Returns the severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Timeout { .. } | Self::Poll { .. } => ErrorSeverity::Warning,
            Self::Exception { code, .. } if matches!(code, 0x05 | 0x06) => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::new(3, 1),
            Self::Exception { .. } => ErrorCode::new(3, 2),
            Self::Protocol { .. } => ErrorCode::new(3, 3),
            Self::Transport { .. } => ErrorCode::new(3, 4),
            Self::UnexpectedValue { .. } => ErrorCode::new(3, 5),
            Self::ShortResponse { .. } => ErrorCode::new(3, 6),
            Self::Poll { .. } => ErrorCode::new(3, 7),
            Self::Sink { .. } => ErrorCode::new(3, 8),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::Timeout { .. } => vec![
                "Verify the controller is powered and its comms address is correct",
                "Check RS-485 wiring and termination",
            ],
            Self::Exception { code: 0x02, .. } => {
                vec!["Check that the controller has the addressed loop fitted"]
            }
            Self::Exception { .. } => vec!["Check the controller's comms configuration"],
            Self::Protocol { .. } => vec![
                "Confirm 19200-8N1 line settings on every controller",
                "Look for a second master on the bus",
            ],
            Self::Transport { .. } => vec!["Check the serial adapter is still attached"],
            Self::UnexpectedValue { .. } | Self::ShortResponse { .. } => {
                vec!["Confirm the device is a Eurotherm 2704"]
            }
            Self::Poll { .. } => vec!["Inspect the warnings logged for each failed read"],
            Self::Sink { .. } => vec!["Check the snapshot output path is writable"],
        }
    }
}

// =============================================================================
// ConnectionError
// =============================================================================

/// Failures to find or open a controller bus.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Device directory could not be read.
    #[error("Cannot read device directory {path}: {source}")]
    DirectoryUnreadable {
        /// Directory path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// No entry in the device directory matched the port family.
    #[error("No serial device matching '{prefix}' in {dir}")]
    NoMatchingPort {
        /// Directory searched.
        dir: PathBuf,
        /// Name prefix searched for.
        prefix: String,
    },

    /// Ports were found but no slave answered a probe.
    #[error("No controller answered on IDs {start}..={end} across {ports} port(s)")]
    NoResponder {
        /// First probed ID.
        start: u8,
        /// Last probed ID.
        end: u8,
        /// Number of ports tried.
        ports: usize,
    },

    /// Serial port not found.
    #[error("Serial port not found: {port}")]
    SerialPortNotFound {
        /// Port path.
        port: String,
    },

    /// Serial port access denied.
    #[error("Serial port access denied: {port}")]
    SerialPortAccessDenied {
        /// Port path.
        port: String,
    },

    /// Serial port could not be configured.
    #[error("Serial port configuration failed for '{port}': {message}")]
    SerialConfigurationFailed {
        /// Port path.
        port: String,
        /// Error message.
        message: String,
    },
}

impl ConnectionError {
    /// Creates a serial port not found error.
    pub fn serial_not_found(port: impl Into<String>) -> Self {
        Self::SerialPortNotFound { port: port.into() }
    }

    /// Creates a serial port access denied error.
    pub fn serial_access_denied(port: impl Into<String>) -> Self {
        Self::SerialPortAccessDenied { port: port.into() }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NoResponder { .. } | Self::SerialPortNotFound { .. } => true,
            Self::NoMatchingPort { .. } => true,
            Self::DirectoryUnreadable { .. }
            | Self::SerialPortAccessDenied { .. }
            | Self::SerialConfigurationFailed { .. } => false,
        }
    }

    /// Returns the severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::SerialPortAccessDenied { .. } | Self::DirectoryUnreadable { .. } => {
                ErrorSeverity::Critical
            }
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::DirectoryUnreadable { .. } => ErrorCode::new(4, 1),
            Self::NoMatchingPort { .. } => ErrorCode::new(4, 2),
            Self::NoResponder { .. } => ErrorCode::new(4, 3),
            Self::SerialPortNotFound { .. } => ErrorCode::new(4, 4),
            Self::SerialPortAccessDenied { .. } => ErrorCode::new(4, 5),
            Self::SerialConfigurationFailed { .. } => ErrorCode::new(4, 6),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::DirectoryUnreadable { .. } => vec!["Check the configured device directory"],
            Self::NoMatchingPort { .. } | Self::SerialPortNotFound { .. } => vec![
                "Verify the USB/RS-485 adapter is plugged in",
                "Check the configured port kind (tty, ttyUSB, ttyS)",
            ],
            Self::NoResponder { .. } => vec![
                "Verify the controllers are powered on",
                "Check the controllers' comms addresses fall inside the probed range",
                "Confirm 19200-8N1 line settings",
            ],
            Self::SerialPortAccessDenied { .. } => vec![
                "Add the service user to the dialout group",
                "Check no other process holds the port",
            ],
            Self::SerialConfigurationFailed { .. } => {
                vec!["Check the adapter supports the configured line settings"]
            }
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational - no action required.
    Info,
    /// Warning - action may be required.
    Warning,
    /// Error - action required, but recoverable.
    Error,
    /// Critical - immediate action required.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code for categorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category (1=range, 2=invalid argument, 3=io, 4=connection).
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }

    /// Returns the full error code as a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.category as u16) << 8) | (self.code as u16)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EU-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// A Result type with EuroError.
pub type EuroResult<T> = Result<T, EuroError>;

// =============================================================================
// Tests
// =============================================================================
