// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Eurotherm Supervisor Integration Tests
//!
//! Test utilities plus integration suites for the supervisor crates.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p euro-tests
//! cargo test -p euro-tests --test integration_network
//! cargo test -p euro-tests --test integration_config
//! ```
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use euro_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let fixture = NetworkFixture::single().await;
//!     fixture.network.set_output(1, LoopId::Loop1, 10.0).await.unwrap();
//!     assert_eq!(fixture.bus.write_count(), 2);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::fixtures::*;
    pub use crate::common::init_test_logging;
    pub use crate::common::mocks::*;
}
