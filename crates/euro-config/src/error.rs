// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Errors raised while loading or checking a supervisor configuration.
//!
//! Validation errors always name the section that failed (`bus.id_range`,
//! `limits`, `poll.interval`, ...) so the operator can find the offending
//! key without reading the whole file.

use std::fmt::Display;
use std::path::PathBuf;

use thiserror::Error;

/// A Result type with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file was read but its contents could not be deserialized.
    #[error("Cannot parse '{path}': {message}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Deserializer message.
        message: String,
    },

    /// A section holds a value the controllers cannot accept.
    #[error("Invalid '{field}': {message}")]
    Validation {
        /// Dotted section name, e.g. `bus.id_range`.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// The file exists but could not be read.
    #[error("Cannot read '{path}': {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No file at the given path.
    #[error("Config file not found: {path}")]
    FileNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// An environment override or placeholder held an unusable value.
    #[error("Environment variable '{name}' is invalid: {message}")]
    InvalidEnvVar {
        /// Variable name.
        name: String,
        /// Why the value was refused.
        message: String,
    },

    /// The file extension maps to no known format.
    #[error("Unsupported config format: {format}")]
    UnsupportedFormat {
        /// Extension as written.
        format: String,
    },

    /// Inline configuration text could not be deserialized.
    #[error("Cannot decode configuration: {message}")]
    Serialization {
        /// Deserializer message.
        message: String,
    },
}

impl ConfigError {
    /// Creates a parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error for `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Wraps an error returned by a controller-side check (calibration,
    /// limits, bus settings) as a validation failure of `field`.
    pub fn rejected(field: impl Into<String>, cause: impl Display) -> Self {
        Self::validation(field, cause.to_string())
    }

    /// Creates an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates an invalid environment variable error.
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// The section that failed validation, if this is a validation error.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// A one-line hint for the operator, shown after the error itself.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::FileNotFound { .. } | Self::Io { .. } => {
                "Pass the config path with --config or set EURO_CONFIG"
            }
            Self::Parse { .. } | Self::UnsupportedFormat { .. } | Self::Serialization { .. } => {
                "Config files must be .yaml, .yml, .toml or .json"
            }
            Self::Validation { field, .. } if field.starts_with("bus") => {
                "Bus settings must match the controllers' comms configuration"
            }
            Self::Validation { .. } => "Run the validate command to check the file",
            Self::InvalidEnvVar { .. } => "Unset or correct the EURO_* override",
        }
    }
}
