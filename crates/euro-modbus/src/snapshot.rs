// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-controller state snapshots.
//!
//! A [`EuroSnapshot`] caches the working values of one controller's three
//! loops. Numeric fields start at [`SENTINEL`] until a poll fills them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::BusTransport;
use crate::error::{EuroError, EuroResult, InvalidArgument, IoError};
use crate::network::{read_register, EuroNetwork};
use crate::registers::{address, decode, decode_signed, ControlMode, LoopId, RegisterField};
use crate::reporter::Origin;

/// Value of a numeric field that has not been read.
pub const SENTINEL: f64 = -1.0;

// =============================================================================
// LoopState
// =============================================================================

/// Last polled state of one loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopState {
    /// `true` once every field of the loop was read in one poll.
    pub active: bool,
    /// Mode flag.
    pub mode: ControlMode,
    /// Process value.
    pub temperature: f64,
    /// Working setpoint.
    pub setpoint: f64,
    /// Working output power.
    pub output: f64,
}

impl LoopState {
    /// Restores the unread state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Default for LoopState {
    fn default() -> Self {
        Self {
            active: false,
            mode: ControlMode::Auto,
            temperature: SENTINEL,
            setpoint: SENTINEL,
            output: SENTINEL,
        }
    }
}

// =============================================================================
// EuroSnapshot
// =============================================================================

/// Cached state of one controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EuroSnapshot {
    /// Slave ID.
    pub id: u8,
    /// Loop states in loop order.
    pub loops: [LoopState; 3],
    /// Time of the last poll that fully read at least one loop.
    pub polled_at: Option<DateTime<Utc>>,
}

impl EuroSnapshot {
    /// Creates an unread snapshot.
    pub fn new(id: u8) -> Self {
        Self {
            id,
            loops: [LoopState::default(); 3],
            polled_at: None,
        }
    }

    /// Returns the state of one loop.
    pub fn loop_state(&self, loop_id: LoopId) -> &LoopState {
        &self.loops[loop_id.index()]
    }

    /// Returns `true` if any loop is active.
    pub fn is_active(&self) -> bool {
        self.loops.iter().any(|l| l.active)
    }

    /// Restores every loop to the unread state.
    pub fn reset(&mut self) {
        self.loops.iter_mut().for_each(LoopState::reset);
        self.polled_at = None;
    }
}

// =============================================================================
// SnapshotTable
// =============================================================================

/// Snapshots keyed by slave ID.
#[derive(Debug, Clone, Default)]
pub struct SnapshotTable {
    snapshots: BTreeMap<u8, EuroSnapshot>,
}

impl SnapshotTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table tracking every connected controller of `network`.
    pub fn for_network<T: BusTransport>(network: &EuroNetwork<T>) -> Self {
        let mut table = Self::new();
        for id in network.connected_ids() {
            table.track(id);
        }
        table
    }

    /// Starts tracking `id`. An existing snapshot is kept.
    pub fn track(&mut self, id: u8) -> &mut EuroSnapshot {
        self.snapshots.entry(id).or_insert_with(|| EuroSnapshot::new(id))
    }

    /// Stops tracking `id` and returns its snapshot.
    pub fn untrack(&mut self, id: u8) -> Option<EuroSnapshot> {
        self.snapshots.remove(&id)
    }

    /// Returns the snapshot of `id`.
    pub fn get(&self, id: u8) -> Option<&EuroSnapshot> {
        self.snapshots.get(&id)
    }

    /// Iterates over snapshots in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &EuroSnapshot> {
        self.snapshots.values()
    }

    /// Returns the number of tracked controllers.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Returns `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Resets the snapshot of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::UntrackedSnapshot`] if `id` is not tracked.
    pub fn reset(&mut self, id: u8) -> EuroResult<()> {
        self.snapshots
            .get_mut(&id)
            .map(EuroSnapshot::reset)
            .ok_or_else(|| InvalidArgument::UntrackedSnapshot { id }.into())
    }

    /// Resets every tracked snapshot.
    pub fn reset_all(&mut self) {
        self.snapshots.values_mut().for_each(EuroSnapshot::reset);
    }
}

// =============================================================================
// Polling
// =============================================================================

/// Counts from one [`EuroNetwork::poll_all`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollSummary {
    /// Register reads attempted.
    pub attempted: usize,
    /// Register reads that failed.
    pub failed: usize,
    /// Loops whose every field was read.
    pub loops_refreshed: usize,
}

impl<T: BusTransport> EuroNetwork<T> {
    /// Reads `PV`, `WkgSp`, `WkgOp` and `ManAutoFlag` of every loop of every
    /// connected controller into `table`.
    ///
    /// Each field is stored as soon as it is read. A failed read does not
    /// stop the remaining reads; a loop with a failed read keeps its
    /// previous `active` flag. Untracked controllers are added to the table.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the network is closed
    /// - [`IoError::Poll`] if any read failed, after all reads were attempted
    pub async fn poll_all(&self, table: &mut SnapshotTable) -> EuroResult<PollSummary> {
        const OP: &str = "poll_all";

        if !self.is_open().await {
            return self.reported(Origin::StateSnapshot, OP, Err(EuroError::network_closed()));
        }

        let mut summary = PollSummary::default();
        let mut first_error: Option<String> = None;

        for id in self.connected_ids() {
            let snapshot = table.track(id);
            let mut refreshed = false;

            for loop_id in LoopId::ALL {
                let errors = self.poll_loop(id, loop_id, snapshot, &mut summary).await;

                if errors.is_empty() {
                    snapshot.loops[loop_id.index()].active = true;
                    summary.loops_refreshed += 1;
                    refreshed = true;
                }

                for e in errors {
                    self.report(Origin::StateSnapshot, OP, &e);
                    first_error.get_or_insert_with(|| e.to_string());
                }
            }

            if refreshed {
                snapshot.polled_at = Some(Utc::now());
            }
        }

        tracing::debug!(
            attempted = summary.attempted,
            failed = summary.failed,
            loops_refreshed = summary.loops_refreshed,
            "Snapshot poll complete"
        );

        match first_error {
            None => Ok(summary),
            Some(first) => Err(IoError::Poll {
                failed: summary.failed,
                attempted: summary.attempted,
                first,
            }
            .into()),
        }
    }

    async fn poll_loop(
        &self,
        id: u8,
        loop_id: LoopId,
        snapshot: &mut EuroSnapshot,
        summary: &mut PollSummary,
    ) -> Vec<EuroError> {
        let mut errors = Vec::new();

        let mut guard = self.bus.lock().await;
        let Some(bus) = guard.as_mut() else {
            summary.attempted += 4;
            summary.failed += 4;
            errors.push(EuroError::network_closed());
            return errors;
        };

        let state = &mut snapshot.loops[loop_id.index()];
        let fields = [
            RegisterField::Pv,
            RegisterField::WkgSp,
            RegisterField::WkgOp,
            RegisterField::ManAutoFlag,
        ];

        for field in fields {
            summary.attempted += 1;
            let addr = address(loop_id, field);

            let raw = match read_register(bus, &self.stats, id, addr).await {
                Ok(raw) => raw,
                Err(e) => {
                    summary.failed += 1;
                    errors.push(e);
                    continue;
                }
            };

            let resolution = self.calibration.resolution(field);
            match field {
                RegisterField::Pv => state.temperature = decode_signed(raw, resolution),
                RegisterField::WkgSp => state.setpoint = decode(raw, resolution),
                RegisterField::WkgOp => state.output = decode(raw, resolution),
                _ => match ControlMode::from_register(raw) {
                    Some(mode) => state.mode = mode,
                    None => {
                        summary.failed += 1;
                        errors.push(IoError::UnexpectedValue { slave: id, address: addr, raw }.into());
                    }
                },
            }
        }

        errors
    }
}

// =============================================================================
// Tests
// =============================================================================
