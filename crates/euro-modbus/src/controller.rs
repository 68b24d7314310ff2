// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Loop commands.
//!
//! Changing what drives a loop is a two-write transaction on the bus:
//!
//! ```text
//! set_output:   ManAutoFlag <- Manual   then   TargetOp <- encode(out_pow)
//! set_setpoint: ManAutoFlag <- Auto     then   TargetSp <- encode(sp)
//! ```
//!
//! The value write is only issued after the mode write succeeded, and the
//! bus lock is held across both so no other request lands in between.
//! Values are checked against the network's [`Limits`](crate::types::Limits)
//! before anything is sent.

use crate::client::BusTransport;
use crate::error::{EuroError, EuroResult, IoError};
use crate::network::{read_register, write_register, EuroNetwork};
use crate::registers::{address, encode, ControlMode, LoopId, RegisterField};
use crate::reporter::Origin;

/// Bytes of register payload written by a successful command.
pub const COMMAND_PAYLOAD_BYTES: usize = 2;

impl<T: BusTransport> EuroNetwork<T> {
    /// Puts `loop_id` of controller `id` in manual mode and sets its output
    /// power in percent.
    ///
    /// Returns the number of payload bytes written to `TargetOp`.
    ///
    /// # Errors
    ///
    /// - `RangeError` if `out_pow` is outside `0..=max_output`; nothing is sent
    /// - `InvalidArgument` if the network is closed or `id` is not connected
    /// - `IoError` if either write fails; a failed mode write means the
    ///   output register is never written
    pub async fn set_output(&self, id: u8, loop_id: LoopId, out_pow: f64) -> EuroResult<usize> {
        let result = match self.limits.check_output(out_pow) {
            Ok(()) => {
                self.drive(id, loop_id, ControlMode::Manual, RegisterField::TargetOp, out_pow)
                    .await
            }
            Err(e) => Err(e.into()),
        };
        self.reported(Origin::LoopController, "set_output", result)
    }

    /// Puts `loop_id` of controller `id` in auto mode and sets its target
    /// setpoint.
    ///
    /// Returns the number of payload bytes written to `TargetSp`. Errors as
    /// for [`set_output`](Self::set_output), with `0..=max_setpoint` as the
    /// legal range.
    pub async fn set_setpoint(&self, id: u8, loop_id: LoopId, sp: f64) -> EuroResult<usize> {
        let result = match self.limits.check_setpoint(sp) {
            Ok(()) => {
                self.drive(id, loop_id, ControlMode::Auto, RegisterField::TargetSp, sp)
                    .await
            }
            Err(e) => Err(e.into()),
        };
        self.reported(Origin::LoopController, "set_setpoint", result)
    }

    /// Reads the mode flag of a loop.
    pub async fn read_mode(&self, id: u8, loop_id: LoopId) -> EuroResult<ControlMode> {
        let addr = address(loop_id, RegisterField::ManAutoFlag);
        let result: EuroResult<ControlMode> = match self.read_one(id, addr).await {
            Ok(raw) => ControlMode::from_register(raw)
                .ok_or_else(|| IoError::UnexpectedValue { slave: id, address: addr, raw }.into()),
            Err(e) => Err(e),
        };
        self.reported(Origin::LoopController, "read_mode", result)
    }

    /// Reads the raw error code register of a loop.
    pub async fn read_error_value(&self, id: u8, loop_id: LoopId) -> EuroResult<u16> {
        let result = self
            .read_one(id, address(loop_id, RegisterField::ErrVal))
            .await;
        self.reported(Origin::LoopController, "read_error_value", result)
    }

    async fn read_one(&self, id: u8, addr: u16) -> EuroResult<u16> {
        let mut guard = self.bus.lock().await;
        let bus = guard.as_mut().ok_or_else(EuroError::network_closed)?;
        if !self.is_connected(id) {
            return Err(EuroError::unknown_controller(id));
        }
        read_register(bus, &self.stats, id, addr).await
    }

    async fn drive(
        &self,
        id: u8,
        loop_id: LoopId,
        mode: ControlMode,
        field: RegisterField,
        value: f64,
    ) -> EuroResult<usize> {
        let raw = encode(value, self.calibration.resolution(field))?;

        let mut guard = self.bus.lock().await;
        let bus = guard.as_mut().ok_or_else(EuroError::network_closed)?;
        if !self.is_connected(id) {
            return Err(EuroError::unknown_controller(id));
        }

        write_register(
            bus,
            &self.stats,
            id,
            address(loop_id, RegisterField::ManAutoFlag),
            mode.register_value(),
        )
        .await?;

        write_register(bus, &self.stats, id, address(loop_id, field), raw).await?;

        tracing::debug!(
            slave = id,
            %loop_id,
            %mode,
            %field,
            value,
            raw,
            "Loop command applied"
        );
        Ok(COMMAND_PAYLOAD_BYTES)
    }
}
