// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bus and device configuration types.
//!
//! - **SerialPortKind**: device-naming families under the device directory
//! - **BusSettings**: RTU line settings with builder (19200-8N1, 50 ms by default)
//! - **Calibration**: per-field fixed-point resolutions
//! - **Limits**: legal command ranges
//!
//! # Examples
//!
//! ```
//! use euro_modbus::types::{BusSettings, SerialPortKind};
//!
//! let settings = BusSettings::builder()
//!     .port_kind(SerialPortKind::TtyUsb)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(settings.baud_rate, 19200);
//! assert_eq!(settings.line_notation(), "19200-8N1");
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EuroError, EuroResult, InvalidArgument, RangeError};
use crate::registers::{encode, RegisterField};

/// Maximum number of controllers tracked on one serial port.
pub const MAX_CONTROLLERS: usize = 3;

/// Reserved broadcast slave ID. Broadcast requests get no reply.
pub const BROADCAST_ID: u8 = 0;

/// Highest valid Modbus slave ID.
pub const MAX_SLAVE_ID: u8 = 247;

// =============================================================================
// SerialPortKind
// =============================================================================

/// Serial device naming family under the device directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SerialPortKind {
    /// Any `tty*` device.
    #[serde(rename = "tty")]
    Tty,
    /// USB serial adapters (`ttyUSB*`).
    #[default]
    #[serde(rename = "ttyUSB")]
    TtyUsb,
    /// On-board UARTs (`ttyS*`).
    #[serde(rename = "ttyS")]
    TtyS,
}

impl SerialPortKind {
    /// Returns the device-name prefix for this family.
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::Tty => "tty",
            Self::TtyUsb => "ttyUSB",
            Self::TtyS => "ttyS",
        }
    }

    /// Returns all port kinds.
    pub const fn all() -> [SerialPortKind; 3] {
        [Self::Tty, Self::TtyUsb, Self::TtyS]
    }
}

impl fmt::Display for SerialPortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for SerialPortKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tty" => Ok(Self::Tty),
            "ttyUSB" | "ttyusb" | "usb" => Ok(Self::TtyUsb),
            "ttyS" | "ttys" | "uart" => Ok(Self::TtyS),
            _ => Err(format!(
                "Unknown serial port kind '{}' (expected tty, ttyUSB or ttyS)",
                s
            )),
        }
    }
}

// =============================================================================
// Serial Port Settings
// =============================================================================

/// Data bits configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataBits {
    /// 7 data bits.
    Seven,
    /// 8 data bits (default).
    #[default]
    Eight,
}

impl DataBits {
    /// Returns the number of bits.
    pub const fn bits(&self) -> u8 {
        match self {
            Self::Seven => 7,
            Self::Eight => 8,
        }
    }
}

/// Parity configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    /// No parity (default).
    #[default]
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

impl Parity {
    /// Returns the short character representation.
    pub const fn char(&self) -> char {
        match self {
            Self::None => 'N',
            Self::Odd => 'O',
            Self::Even => 'E',
        }
    }
}

/// Stop bits configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    /// 1 stop bit (default).
    #[default]
    One,
    /// 2 stop bits.
    Two,
}

impl StopBits {
    /// Returns the number of stop bits.
    pub const fn bits(&self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

// =============================================================================
// BusSettings
// =============================================================================

/// RTU line settings shared by every controller on one port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusSettings {
    /// Directory scanned for serial devices.
    #[serde(default = "default_device_dir")]
    pub device_dir: PathBuf,

    /// Device naming family to scan for.
    #[serde(default)]
    pub port_kind: SerialPortKind,

    /// Baud rate.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Data bits.
    #[serde(default)]
    pub data_bits: DataBits,

    /// Parity.
    #[serde(default)]
    pub parity: Parity,

    /// Stop bits.
    #[serde(default)]
    pub stop_bits: StopBits,

    /// Per-request response timeout.
    #[serde(default = "default_response_timeout", with = "humantime_serde")]
    pub response_timeout: Duration,
}

fn default_device_dir() -> PathBuf {
    PathBuf::from("/dev")
}

fn default_baud_rate() -> u32 {
    19200
}

fn default_response_timeout() -> Duration {
    Duration::from_millis(50)
}

impl BusSettings {
    /// Creates a new builder.
    pub fn builder() -> BusSettingsBuilder {
        BusSettingsBuilder::default()
    }

    /// Returns the line notation, e.g. `19200-8N1`.
    pub fn line_notation(&self) -> String {
        format!(
            "{}-{}{}{}",
            self.baud_rate,
            self.data_bits.bits(),
            self.parity.char(),
            self.stop_bits.bits()
        )
    }

    /// Validates these settings.
    pub fn validate(&self) -> EuroResult<()> {
        const VALID_BAUD_RATES: &[u32] = &[1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200];

        if !VALID_BAUD_RATES.contains(&self.baud_rate) {
            return Err(RangeError::out_of_range(
                "baud rate",
                self.baud_rate as f64,
                1200.0,
                115200.0,
            )
            .into());
        }

        if self.response_timeout.is_zero() {
            return Err(RangeError::out_of_range("response timeout (ms)", 0.0, 1.0, f64::MAX).into());
        }

        Ok(())
    }
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            device_dir: default_device_dir(),
            port_kind: SerialPortKind::default(),
            baud_rate: default_baud_rate(),
            data_bits: DataBits::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            response_timeout: default_response_timeout(),
        }
    }
}

// =============================================================================
// BusSettingsBuilder
// =============================================================================

/// Builder for [`BusSettings`].
#[derive(Debug, Default)]
pub struct BusSettingsBuilder {
    device_dir: Option<PathBuf>,
    port_kind: Option<SerialPortKind>,
    baud_rate: Option<u32>,
    data_bits: Option<DataBits>,
    parity: Option<Parity>,
    stop_bits: Option<StopBits>,
    response_timeout: Option<Duration>,
}

impl BusSettingsBuilder {
    /// Sets the device directory.
    pub fn device_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.device_dir = Some(dir.into());
        self
    }

    /// Sets the port kind.
    pub fn port_kind(mut self, kind: SerialPortKind) -> Self {
        self.port_kind = Some(kind);
        self
    }

    /// Sets the baud rate.
    pub fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = Some(rate);
        self
    }

    /// Sets the data bits.
    pub fn data_bits(mut self, bits: DataBits) -> Self {
        self.data_bits = Some(bits);
        self
    }

    /// Sets the parity.
    pub fn parity(mut self, parity: Parity) -> Self {
        self.parity = Some(parity);
        self
    }

    /// Sets the stop bits.
    pub fn stop_bits(mut self, bits: StopBits) -> Self {
        self.stop_bits = Some(bits);
        self
    }

    /// Sets the response timeout.
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    /// Builds and validates the settings.
    pub fn build(self) -> EuroResult<BusSettings> {
        let settings = BusSettings {
            device_dir: self.device_dir.unwrap_or_else(default_device_dir),
            port_kind: self.port_kind.unwrap_or_default(),
            baud_rate: self.baud_rate.unwrap_or_else(default_baud_rate),
            data_bits: self.data_bits.unwrap_or_default(),
            parity: self.parity.unwrap_or_default(),
            stop_bits: self.stop_bits.unwrap_or_default(),
            response_timeout: self.response_timeout.unwrap_or_else(default_response_timeout),
        };

        settings.validate()?;
        Ok(settings)
    }
}

// =============================================================================
// Slave ID range
// =============================================================================

/// Validates a candidate slave-ID range for probing.
///
/// The range must be non-empty, exclude the broadcast ID and stay within
/// the Modbus address space.
pub fn validate_id_range(start: u8, end: u8) -> EuroResult<()> {
    if start == BROADCAST_ID {
        return Err(InvalidArgument::BroadcastId.into());
    }
    if start > end {
        return Err(InvalidArgument::EmptyIdRange { start, end }.into());
    }
    if end > MAX_SLAVE_ID {
        return Err(RangeError::out_of_range("slave ID", end as f64, 1.0, MAX_SLAVE_ID as f64).into());
    }
    Ok(())
}

// =============================================================================
// Calibration
// =============================================================================

/// Decimal resolutions used to scale engineering values into registers.
///
/// A resolution of `n` stores `value * 10^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calibration {
    /// Process value (temperature) resolution.
    #[serde(default = "default_pv_resolution")]
    pub pv_resolution: u8,

    /// Setpoint resolution.
    #[serde(default = "default_setpoint_resolution")]
    pub setpoint_resolution: u8,

    /// Output power resolution.
    #[serde(default)]
    pub output_resolution: u8,
}

fn default_pv_resolution() -> u8 {
    1
}

fn default_setpoint_resolution() -> u8 {
    1
}

/// Largest supported resolution; 10^5 would overflow any useful payload.
pub const MAX_RESOLUTION: u8 = 4;

impl Calibration {
    /// Returns the resolution applied to a register field.
    pub fn resolution(&self, field: RegisterField) -> u8 {
        match field {
            RegisterField::Pv => self.pv_resolution,
            RegisterField::TargetSp | RegisterField::WkgSp => self.setpoint_resolution,
            RegisterField::TargetOp | RegisterField::WkgOp => self.output_resolution,
            RegisterField::ErrVal | RegisterField::ManAutoFlag => 0,
        }
    }

    /// Validates the resolutions.
    pub fn validate(&self) -> EuroResult<()> {
        for (name, value) in [
            ("pv resolution", self.pv_resolution),
            ("setpoint resolution", self.setpoint_resolution),
            ("output resolution", self.output_resolution),
        ] {
            if value > MAX_RESOLUTION {
                return Err(RangeError::out_of_range(name, value as f64, 0.0, MAX_RESOLUTION as f64).into());
            }
        }
        Ok(())
    }

    /// Checks that both command ceilings in `limits` still fit a register
    /// payload at these resolutions.
    pub fn check_limits(&self, limits: &Limits) -> Result<(), RangeError> {
        encode(limits.max_output, self.output_resolution)?;
        encode(limits.max_setpoint, self.setpoint_resolution)?;
        Ok(())
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            pv_resolution: default_pv_resolution(),
            setpoint_resolution: default_setpoint_resolution(),
            output_resolution: 0,
        }
    }
}

// =============================================================================
// Limits
// =============================================================================

/// Hardware ceiling for output power in percent.
pub const OUTPUT_CEILING: f64 = 100.0;

/// Hardware ceiling for setpoints in degrees.
pub const SETPOINT_CEILING: f64 = 5000.0;

/// Legal command ranges. Both lower bounds are zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum output power (percent).
    #[serde(default = "default_max_output")]
    pub max_output: f64,

    /// Maximum setpoint.
    #[serde(default = "default_max_setpoint")]
    pub max_setpoint: f64,
}

fn default_max_output() -> f64 {
    OUTPUT_CEILING
}

fn default_max_setpoint() -> f64 {
    SETPOINT_CEILING
}

impl Limits {
    /// Checks an output power request.
    pub fn check_output(&self, out_pow: f64) -> Result<(), RangeError> {
        check_range("output power", out_pow, self.max_output)
    }

    /// Checks a setpoint request.
    pub fn check_setpoint(&self, sp: f64) -> Result<(), RangeError> {
        check_range("setpoint", sp, self.max_setpoint)
    }

    /// Validates that limits never exceed the hardware ceilings.
    pub fn validate(&self) -> EuroResult<()> {
        if !(self.max_output > 0.0 && self.max_output <= OUTPUT_CEILING) {
            return Err(EuroError::from(RangeError::out_of_range(
                "max output",
                self.max_output,
                0.0,
                OUTPUT_CEILING,
            )));
        }
        if !(self.max_setpoint > 0.0 && self.max_setpoint <= SETPOINT_CEILING) {
            return Err(EuroError::from(RangeError::out_of_range(
                "max setpoint",
                self.max_setpoint,
                0.0,
                SETPOINT_CEILING,
            )));
        }
        Ok(())
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_output: default_max_output(),
            max_setpoint: default_max_setpoint(),
        }
    }
}

// NaN fails both comparisons and is rejected.
fn check_range(quantity: &'static str, value: f64, max: f64) -> Result<(), RangeError> {
    if value >= 0.0 && value <= max {
        Ok(())
    } else {
        Err(RangeError::out_of_range(quantity, value, 0.0, max))
    }
}

// =============================================================================
// Tests
// =============================================================================
