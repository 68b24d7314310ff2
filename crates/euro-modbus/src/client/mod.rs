// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bus transports.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  EuroNetwork (loop control, snapshot poll)  │
//! └─────────────────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌─────────────────────────────────────────────┐
//! │        BusTransport / BusOpener             │
//! └─────────────────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌─────────────────────────────────────────────┐
//! │     RtuBus (tokio-modbus + tokio-serial)    │
//! └─────────────────────────────────────────────┘
//! ```

mod rtu;
mod transport;

pub use rtu::{RtuBus, RtuOpener};
pub use transport::{BusOpener, BusTransport};

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::{EuroError, IoError};

// =============================================================================
// BusStats
// =============================================================================

/// Request counters for one bus.
#[derive(Debug)]
pub struct BusStats {
    reads: AtomicU64,
    writes: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
    total_response_time_us: AtomicU64,
}

impl BusStats {
    /// Creates zeroed statistics.
    pub fn new() -> Self {
        Self {
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
        }
    }

    /// Records a successful read.
    pub fn record_read(&self, duration: Duration) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Records a successful write.
    pub fn record_write(&self, duration: Duration) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Records a failed request.
    pub fn record_error(&self, error: &EuroError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        if matches!(error, EuroError::Io(IoError::Timeout { .. })) {
            self.timeouts.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Returns the number of successful reads.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the number of successful writes.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns the number of failed requests.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Returns the number of failed requests that timed out.
    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Returns the total number of requests.
    pub fn total_requests(&self) -> u64 {
        self.reads() + self.writes() + self.failures()
    }

    /// Returns the average response time of successful requests.
    pub fn average_response_time(&self) -> Duration {
        let success = self.reads() + self.writes();
        if success == 0 {
            return Duration::ZERO;
        }
        let total_us = self.total_response_time_us.load(Ordering::Relaxed);
        Duration::from_micros(total_us / success)
    }
}

impl Default for BusStats {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
