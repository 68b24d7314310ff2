// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Common Test Utilities
//!
//! - `fixtures`: probed networks, register values, device directories, config files
//! - `mocks`: scriptable serial line and port opener

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static LOGGING: Once = Once::new();

/// Routes supervisor logs through the test harness so they show up only for
/// failing tests. `RUST_LOG` overrides the default filter.
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,euro_modbus=debug,euro_config=info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_test_writer()
            .try_init();
    });
}
