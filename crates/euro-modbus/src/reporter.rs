// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Failure reporting.
//!
//! Every failing operation hands a [`FailureReport`] to the network's
//! [`ErrorReporter`] before returning its error. Reporting is
//! fire-and-forget: it never changes the result the caller sees.

use std::fmt;
use std::sync::Mutex;

use serde::Serialize;

use crate::error::EuroError;

/// Component that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Port discovery and bus setup.
    ConnectionManager,
    /// Output and setpoint commands.
    LoopController,
    /// Snapshot polling.
    StateSnapshot,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ConnectionManager => "connection_manager",
            Self::LoopController => "loop_controller",
            Self::StateSnapshot => "state_snapshot",
        };
        f.write_str(s)
    }
}

/// One failure, as delivered to an [`ErrorReporter`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReport {
    /// Component that failed.
    pub origin: Origin,
    /// Operation name, e.g. `set_output`.
    pub operation: &'static str,
    /// Human-readable cause.
    pub cause: String,
    /// Structured error code, e.g. `EU-0301`.
    pub code: String,
}

impl FailureReport {
    /// Builds a report from an error.
    pub fn new(origin: Origin, operation: &'static str, error: &EuroError) -> Self {
        Self {
            origin,
            operation,
            cause: error.to_string(),
            code: error.error_code().to_string(),
        }
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}::{}: {}", self.code, self.origin, self.operation, self.cause)
    }
}

/// Sink for failure reports.
pub trait ErrorReporter: Send + Sync {
    /// Receives one report. Must not block on the bus.
    fn report(&self, report: FailureReport);
}

/// Reports failures as `tracing` warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, report: FailureReport) {
        tracing::warn!(
            origin = %report.origin,
            operation = report.operation,
            error_code = %report.code,
            "{}",
            report.cause
        );
    }
}

/// Drops every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl ErrorReporter for NullReporter {
    fn report(&self, _report: FailureReport) {}
}

/// Keeps reports in memory for later inspection.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<FailureReport>>,
}

impl RecordingReporter {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded reports.
    pub fn reports(&self) -> Vec<FailureReport> {
        self.reports
            .lock()
            .map(|reports| reports.clone())
            .unwrap_or_default()
    }

    /// Returns the number of recorded reports.
    pub fn len(&self) -> usize {
        self.reports.lock().map(|reports| reports.len()).unwrap_or(0)
    }

    /// Returns `true` if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, report: FailureReport) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
