// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Logging and tracing initialization.

use tracing_subscriber::{filter::Directive, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::LogFormat;

/// Directives applied on top of the requested level.
const QUIET_TARGETS: &[&str] = &["tokio_modbus=warn", "tokio_serial=warn", "mio_serial=warn"];

// =============================================================================
// Logging Initialization
// =============================================================================

/// Initializes the logging subsystem.
///
/// `RUST_LOG` takes precedence over `level` when set.
///
/// ```ignore
/// use euro_bin::cli::LogFormat;
/// use euro_bin::logging::init_logging;
///
/// init_logging("info", LogFormat::Text);
/// ```
pub fn init_logging(level: &str, format: LogFormat) {
    let filter = build_filter(level);

    match format {
        LogFormat::Text => init_text_logging(filter),
        LogFormat::Json => init_json_logging(filter),
        LogFormat::Compact => init_compact_logging(filter),
    }
}

/// Builds the filter for `level` plus the transport crate directives.
pub fn build_filter(level: &str) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    for target in QUIET_TARGETS {
        if let Ok(directive) = target.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

fn init_text_logging(filter: EnvFilter) {
    let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stderr());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(is_terminal),
        )
        .init();
}

fn init_json_logging(filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_current_span(true),
        )
        .init();
}

fn init_compact_logging(filter: EnvFilter) {
    let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stderr());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(is_terminal),
        )
        .init();
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_includes_transport_directives() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let rendered = build_filter("debug").to_string();
        assert!(rendered.contains("debug"));
        assert!(rendered.contains("tokio_modbus=warn"));
    }
}
