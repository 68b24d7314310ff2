// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # euro-bin
//!
//! Command-line supervisor for Eurotherm 2704 controller networks.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────────────────┐
//! │ main.rs  │──▶│  cli.rs  │──▶│ commands::execute    │
//! └──────────┘   └──────────┘   └──────────┬───────────┘
//!                                          │
//!                ┌─────────────┬───────────┼────────────┐
//!                ▼             ▼           ▼            ▼
//!           ┌─────────┐  ┌──────────┐ ┌─────────┐ ┌──────────┐
//!           │ logging │  │ runtime  │ │shutdown │ │ euro-*   │
//!           └─────────┘  │Supervisor│ │(signals)│ │ crates   │
//!                        └──────────┘ └─────────┘ └──────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Find the controller port
//! eurotherm discover
//!
//! # Poll every 2 seconds until Ctrl-C, then zero every output
//! eurotherm poll --interval 2s
//!
//! # Put loop 2 of controller 1 in manual at 35 %
//! eurotherm set-output 1 2 35
//!
//! # Fail-safe shutdown
//! eurotherm shutdown
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::Supervisor;
pub use shutdown::{ShutdownCoordinator, ShutdownToken};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
