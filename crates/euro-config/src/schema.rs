// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema definitions.
//!
//! # Schema Structure
//!
//! ```text
//! SupervisorConfig
//! ├── bus: BusConfig
//! │   └── id_range: IdRange
//! ├── calibration: Calibration
//! ├── limits: Limits
//! ├── poll: PollConfig
//! ├── logging: LoggingConfig
//! └── record: Option<PathBuf>
//! ```

use std::path::PathBuf;
use std::time::Duration;

use euro_modbus::types::{
    validate_id_range, BusSettings, Calibration, DataBits, Limits, Parity, SerialPortKind,
    StopBits, MAX_CONTROLLERS,
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Constants
// =============================================================================

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Minimum poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

// =============================================================================
// SupervisorConfig
// =============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Serial bus settings.
    #[serde(default)]
    pub bus: BusConfig,

    /// Register scaling.
    #[serde(default)]
    pub calibration: Calibration,

    /// Command limits.
    #[serde(default)]
    pub limits: Limits,

    /// Polling schedule.
    #[serde(default)]
    pub poll: PollConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// JSON Lines file receiving polled snapshots.
    #[serde(default)]
    pub record: Option<PathBuf>,
}

impl SupervisorConfig {
    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.bus.validate()?;

        self.calibration
            .validate()
            .map_err(|e| ConfigError::rejected("calibration", e))?;

        self.limits
            .validate()
            .map_err(|e| ConfigError::rejected("limits", e))?;

        // A limit the registers cannot hold would only fail after the port is open.
        self.calibration
            .check_limits(&self.limits)
            .map_err(|e| ConfigError::rejected("calibration", e))?;

        self.poll.validate()?;
        self.logging.validate()?;

        Ok(())
    }
}

// =============================================================================
// Bus Configuration
// =============================================================================

/// Serial bus section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// Directory scanned for serial devices.
    #[serde(default = "default_device_dir")]
    pub device_dir: PathBuf,

    /// Device naming family.
    #[serde(default)]
    pub port_kind: SerialPortKind,

    /// Baud rate.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Data bits (7 or 8).
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,

    /// Parity.
    #[serde(default)]
    pub parity: Parity,

    /// Stop bits (1 or 2).
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,

    /// Per-request response timeout.
    #[serde(default = "default_response_timeout", with = "humantime_serde")]
    pub response_timeout: Duration,

    /// Slave IDs probed during discovery.
    #[serde(default)]
    pub id_range: IdRange,
}

fn default_device_dir() -> PathBuf {
    PathBuf::from("/dev")
}

fn default_baud_rate() -> u32 {
    19200
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_response_timeout() -> Duration {
    Duration::from_millis(50)
}

impl BusConfig {
    /// Validates the bus section.
    pub fn validate(&self) -> ConfigResult<()> {
        self.to_bus_settings()?;
        self.id_range.validate()
    }

    /// Converts into runtime line settings.
    pub fn to_bus_settings(&self) -> ConfigResult<BusSettings> {
        let data_bits = match self.data_bits {
            7 => DataBits::Seven,
            8 => DataBits::Eight,
            other => {
                return Err(ConfigError::validation(
                    "bus.data_bits",
                    format!("expected 7 or 8, got {}", other),
                ))
            }
        };

        let stop_bits = match self.stop_bits {
            1 => StopBits::One,
            2 => StopBits::Two,
            other => {
                return Err(ConfigError::validation(
                    "bus.stop_bits",
                    format!("expected 1 or 2, got {}", other),
                ))
            }
        };

        BusSettings::builder()
            .device_dir(self.device_dir.clone())
            .port_kind(self.port_kind)
            .baud_rate(self.baud_rate)
            .data_bits(data_bits)
            .parity(self.parity)
            .stop_bits(stop_bits)
            .response_timeout(self.response_timeout)
            .build()
            .map_err(|e| ConfigError::rejected("bus", e))
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            device_dir: default_device_dir(),
            port_kind: SerialPortKind::default(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            parity: Parity::default(),
            stop_bits: default_stop_bits(),
            response_timeout: default_response_timeout(),
            id_range: IdRange::default(),
        }
    }
}

/// Inclusive slave ID range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdRange {
    /// First ID probed.
    pub start: u8,
    /// Last ID probed.
    pub end: u8,
}

impl IdRange {
    /// Validates the range. A range wider than the slot count is accepted
    /// with a warning; only the lowest responders are kept.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_id_range(self.start, self.end)
            .map_err(|e| ConfigError::rejected("bus.id_range", e))?;

        let width = (self.end - self.start) as usize + 1;
        if width > MAX_CONTROLLERS {
            tracing::warn!(
                start = self.start,
                end = self.end,
                slots = MAX_CONTROLLERS,
                "ID range is wider than the controller slots"
            );
        }
        Ok(())
    }

    /// Returns the range for discovery.
    pub fn to_range(&self) -> std::ops::RangeInclusive<u8> {
        self.start..=self.end
    }
}

impl Default for IdRange {
    fn default() -> Self {
        Self { start: 1, end: 3 }
    }
}

// =============================================================================
// Poll Configuration
// =============================================================================

/// Polling schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    /// Time between polls.
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub interval: Duration,
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

impl PollConfig {
    /// Validates the poll section.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.interval < MIN_POLL_INTERVAL {
            return Err(ConfigError::validation(
                "poll.interval",
                format!(
                    "must be at least {}",
                    humantime::format_duration(MIN_POLL_INTERVAL)
                ),
            ));
        }
        Ok(())
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
        }
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Validates the logging configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        Ok(())
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the filter directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parses a level name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Compact single-line text.
    Compact,
    /// JSON for log shippers.
    Json,
}

impl LogFormat {
    /// Returns the format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
