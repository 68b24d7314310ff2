// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # euro-config
//!
//! Configuration for the Eurotherm supervisor.
//!
//! ## Features
//!
//! - **Schema Definition**: bus, calibration, limits, polling and logging
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Environment Overrides**: override selected values via `EURO_*` variables
//!
//! ## Quick Start
//!
//! ```no_run
//! use euro_config::loader::load_config;
//!
//! let config = load_config("eurotherm.yaml").unwrap();
//! let settings = config.bus.to_bus_settings().unwrap();
//!
//! println!("Line: {}", settings.line_notation());
//! ```
//!
//! ## Example File
//!
//! ```yaml
//! bus:
//!   device_dir: /dev
//!   port_kind: ttyUSB
//!   response_timeout: 50ms
//!   id_range: { start: 1, end: 3 }
//! calibration:
//!   setpoint_resolution: 1
//! limits:
//!   max_output: 100
//! poll:
//!   interval: 1s
//! logging:
//!   level: "${EURO_LEVEL:info}"
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod error;
pub mod loader;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_config_str, ConfigFormat, ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{
    BusConfig, IdRange, LogFormat, LogLevel, LoggingConfig, PollConfig, SupervisorConfig,
    DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
