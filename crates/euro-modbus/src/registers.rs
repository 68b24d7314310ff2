// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Eurotherm 2704 register map.
//!
//! Each of the three PID loops occupies its own register block. A field's
//! absolute address is the loop base plus the field offset:
//!
//! ```text
//! Loop1 base    1     PV          +0
//! Loop2 base 1025     TargetSp    +1
//! Loop3 base 2049     TargetOp    +2
//!                     WkgOp       +3   (read-only)
//!                     WkgSp       +5   (read-only)
//!                     ErrVal      +105
//!                     ManAutoFlag +273
//! ```
//!
//! Values are fixed-point: a register holds `round(value * 10^resolution)`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RangeError;

// =============================================================================
// LoopId
// =============================================================================

/// One of the three PID loops in a 2704 unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopId {
    /// Loop 1.
    Loop1,
    /// Loop 2.
    Loop2,
    /// Loop 3.
    Loop3,
}

impl LoopId {
    /// All loops in register order.
    pub const ALL: [LoopId; 3] = [LoopId::Loop1, LoopId::Loop2, LoopId::Loop3];

    /// Returns the first register of this loop's block.
    pub const fn base(self) -> u16 {
        match self {
            Self::Loop1 => 1,
            Self::Loop2 => 1025,
            Self::Loop3 => 2049,
        }
    }

    /// Returns the zero-based index of this loop.
    pub const fn index(self) -> usize {
        match self {
            Self::Loop1 => 0,
            Self::Loop2 => 1,
            Self::Loop3 => 2,
        }
    }

    /// Returns the loop for a one-based loop number.
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::Loop1),
            2 => Some(Self::Loop2),
            3 => Some(Self::Loop3),
            _ => None,
        }
    }

    /// Returns the one-based loop number.
    pub const fn number(self) -> u8 {
        self.index() as u8 + 1
    }
}

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loop{}", self.number())
    }
}

impl FromStr for LoopId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim_start_matches("loop").trim_start_matches("Loop");
        digits
            .parse::<u8>()
            .ok()
            .and_then(Self::from_number)
            .ok_or_else(|| format!("Unknown loop '{}' (expected 1, 2 or 3)", s))
    }
}

// =============================================================================
// RegisterField
// =============================================================================

/// A register within a loop block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterField {
    /// Process value (measured temperature).
    Pv,
    /// Target setpoint; drives the loop in auto mode.
    TargetSp,
    /// Target output power; drives the loop in manual mode.
    TargetOp,
    /// Working output power.
    WkgOp,
    /// Working setpoint.
    WkgSp,
    /// Loop error code.
    ErrVal,
    /// Auto/manual mode flag.
    ManAutoFlag,
}

impl RegisterField {
    /// Returns the offset from the loop base.
    pub const fn offset(self) -> u16 {
        match self {
            Self::Pv => 0,
            Self::TargetSp => 1,
            Self::TargetOp => 2,
            Self::WkgOp => 3,
            Self::WkgSp => 5,
            Self::ErrVal => 105,
            Self::ManAutoFlag => 273,
        }
    }

    /// Returns `true` if the controller accepts writes to this field.
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::TargetSp | Self::TargetOp | Self::ManAutoFlag)
    }
}

impl fmt::Display for RegisterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pv => "pv",
            Self::TargetSp => "target_sp",
            Self::TargetOp => "target_op",
            Self::WkgOp => "wkg_op",
            Self::WkgSp => "wkg_sp",
            Self::ErrVal => "err_val",
            Self::ManAutoFlag => "man_auto_flag",
        };
        f.write_str(s)
    }
}

// =============================================================================
// ControlMode
// =============================================================================

/// Which target register drives a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Driven by `TargetSp`.
    #[default]
    Auto,
    /// Driven by `TargetOp`.
    Manual,
}

impl ControlMode {
    /// Returns the `ManAutoFlag` register value.
    pub const fn register_value(self) -> u16 {
        match self {
            Self::Auto => 0,
            Self::Manual => 1,
        }
    }

    /// Decodes a `ManAutoFlag` register value.
    pub fn from_register(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Self::Auto),
            1 => Some(Self::Manual),
            _ => None,
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

// =============================================================================
// Address and scaling
// =============================================================================

/// Returns the absolute register address of a loop field.
pub const fn address(loop_id: LoopId, field: RegisterField) -> u16 {
    loop_id.base() + field.offset()
}

/// Scales an engineering value into a register payload.
///
/// Returns [`RangeError::EncodingOverflow`] when the scaled value is not
/// finite, negative or above `u16::MAX`.
pub fn encode(value: f64, resolution: u8) -> Result<u16, RangeError> {
    let scaled = (value * 10f64.powi(resolution as i32)).round();

    if !scaled.is_finite() || scaled < 0.0 || scaled > u16::MAX as f64 {
        return Err(RangeError::EncodingOverflow { value, resolution });
    }

    Ok(scaled as u16)
}

/// Converts a register payload back into an engineering value.
pub fn decode(raw: u16, resolution: u8) -> f64 {
    raw as f64 / 10f64.powi(resolution as i32)
}

/// Like [`decode`], but reads the payload as two's complement.
///
/// The process value goes below zero on a cold or reversed thermocouple,
/// so `0xFF9C` at resolution 1 is -10.0 rather than 6543.6. Setpoints and
/// output power are never negative and keep the unsigned reading.
pub fn decode_signed(raw: u16, resolution: u8) -> f64 {
    raw as i16 as f64 / 10f64.powi(resolution as i32)
}

// =============================================================================
// Tests
// =============================================================================
