// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Snapshot sinks.
//!
//! A sink receives polled snapshots for storage elsewhere. The crate ships
//! a JSON Lines writer and an in-memory sink.

use std::io::{self, Write};

use crate::error::{EuroResult, IoError};
use crate::snapshot::{EuroSnapshot, SnapshotTable};

/// Consumer of polled snapshots.
pub trait SnapshotSink {
    /// Accepts one snapshot.
    fn accept(&mut self, snapshot: &EuroSnapshot) -> EuroResult<()>;

    /// Accepts every snapshot in `table`, in ID order. Returns the count.
    fn accept_all(&mut self, table: &SnapshotTable) -> EuroResult<usize> {
        let mut count = 0;
        for snapshot in table.iter() {
            self.accept(snapshot)?;
            count += 1;
        }
        Ok(count)
    }
}

// =============================================================================
// JsonLinesSink
// =============================================================================

/// Writes one JSON object per snapshot per line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, snapshot: &EuroSnapshot) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, snapshot)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl<W: Write> SnapshotSink for JsonLinesSink<W> {
    fn accept(&mut self, snapshot: &EuroSnapshot) -> EuroResult<()> {
        self.write_line(snapshot)
            .map_err(|source| IoError::Sink { source }.into())
    }
}

// =============================================================================
// MemorySink
// =============================================================================

/// Keeps every snapshot it receives.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    snapshots: Vec<EuroSnapshot>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the received snapshots in arrival order.
    pub fn snapshots(&self) -> &[EuroSnapshot] {
        &self.snapshots
    }
}

impl SnapshotSink for MemorySink {
    fn accept(&mut self, snapshot: &EuroSnapshot) -> EuroResult<()> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
