// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the supervisor binary.

use thiserror::Error;

/// Result type alias for euro-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Errors that can occur in the supervisor binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Runtime error.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Config loading error.
    #[error("Config error: {0}")]
    Config(#[from] euro_config::ConfigError),

    /// Controller network error.
    #[error("Controller error: {0}")]
    Controller(#[from] euro_modbus::EuroError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        /// The context description.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a runtime error.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Creates an I/O error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Adds context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the exit code for this error.
    ///
    /// Controller errors map by kind: range 4, invalid argument 5, I/O 6,
    /// connection 7.
    pub fn exit_code(&self) -> i32 {
        use euro_modbus::ErrorKind;

        match self {
            Self::Configuration(_) | Self::Config(_) => 1,
            Self::Runtime(_) => 2,
            Self::Io(_) => 3,
            Self::Controller(e) => match e.kind() {
                ErrorKind::Range => 4,
                ErrorKind::InvalidArgument => 5,
                ErrorKind::Io => 6,
                ErrorKind::Connection => 7,
            },
            Self::WithContext { source, .. } => source.exit_code(),
        }
    }

    /// Returns recovery hints for controller and config errors.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::Controller(e) => e.recovery_hints(),
            Self::Config(e) => vec![e.hint()],
            Self::WithContext { source, .. } => source.recovery_hints(),
            _ => Vec::new(),
        }
    }
}

impl From<std::io::Error> for BinError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<anyhow::Error> for BinError {
    fn from(err: anyhow::Error) -> Self {
        Self::Runtime(format!("{:#}", err))
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Prints an error, its cause chain and any recovery hints.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {}", error);

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }

    for hint in error.recovery_hints() {
        eprintln!("  Hint: {}", hint);
    }
}

/// Reports an error and exits with the appropriate code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================
