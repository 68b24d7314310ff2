// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `poll` command.
//!
//! A single poll releases the port afterwards. Repeated polling runs until
//! the count is reached or a signal arrives, then performs the fail-safe
//! shutdown.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use euro_modbus::{
    ErrorKind, EuroNetwork, EuroResult, EuroSnapshot, PollSummary, RtuBus, SnapshotSink,
    SnapshotTable,
};

use crate::cli::{OutputFormat, PollArgs};
use crate::error::BinResult;
use crate::runtime::{RecordSink, Supervisor};
use crate::shutdown::ShutdownCoordinator;

/// Polls the discovered network and prints each pass.
pub async fn poll(supervisor: &Supervisor, args: PollArgs) -> BinResult<()> {
    let mut record = supervisor.open_record()?;
    let network = supervisor.connect().await?;
    let mut table = SnapshotTable::for_network(&network);

    if !args.is_continuous() {
        let result = poll_once(&network, &mut table, record.as_mut(), args.format).await;
        network.release().await?;
        result?;
        return Ok(());
    }

    let interval = args.interval.unwrap_or(supervisor.config().poll.interval);
    let result = poll_loop(&network, &mut table, record.as_mut(), &args, interval).await;

    let outcome = network.shutdown().await?;
    info!(
        loops_zeroed = outcome.loops_zeroed,
        failures = outcome.failures,
        "Polling stopped"
    );
    result
}

async fn poll_loop(
    network: &EuroNetwork<RtuBus>,
    table: &mut SnapshotTable,
    mut record: Option<&mut RecordSink>,
    args: &PollArgs,
    interval: Duration,
) -> BinResult<()> {
    let coordinator = ShutdownCoordinator::new();
    let signals = coordinator.listen_for_signals();

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut passes = 0u64;
    let result = loop {
        tokio::select! {
            _ = coordinator.wait() => break Ok(()),
            _ = ticker.tick() => {}
        }

        match poll_once(network, table, record.as_deref_mut(), args.format).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::Io => {
                warn!(error = %e, "Poll incomplete");
            }
            Err(e) => break Err(e.into()),
        }

        passes += 1;
        if args.count.map_or(false, |n| passes >= n) {
            break Ok(());
        }
    };

    signals.abort();
    info!(passes, "Poll loop finished");
    result
}

/// Runs one poll pass, prints the table and forwards it to `record`.
///
/// The table is printed even when some reads failed.
async fn poll_once(
    network: &EuroNetwork<RtuBus>,
    table: &mut SnapshotTable,
    record: Option<&mut RecordSink>,
    format: OutputFormat,
) -> EuroResult<PollSummary> {
    let result = network.poll_all(table).await;

    for snapshot in table.iter() {
        println!("{}", render(snapshot, format));
    }

    if let Some(sink) = record {
        if let Err(e) = sink.accept_all(table) {
            e.log("Recording snapshots");
        }
    }

    result
}

fn render(snapshot: &EuroSnapshot, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string(snapshot).unwrap_or_default(),
        OutputFormat::Text => {
            let mut lines = Vec::with_capacity(snapshot.loops.len());
            for (index, state) in snapshot.loops.iter().enumerate() {
                lines.push(format!(
                    "id {:>3} loop{} {:<8} {:<6} pv {:>8.1}  sp {:>8.1}  op {:>6.1}",
                    snapshot.id,
                    index + 1,
                    if state.active { "active" } else { "inactive" },
                    state.mode.to_string(),
                    state.temperature,
                    state.setpoint,
                    state.output,
                ));
            }
            lines.join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euro_modbus::ControlMode;

    #[test]
    fn test_render_text() {
        let mut snapshot = EuroSnapshot::new(1);
        snapshot.loops[1].active = true;
        snapshot.loops[1].mode = ControlMode::Manual;
        snapshot.loops[1].temperature = 812.5;

        let text = render(&snapshot, OutputFormat::Text);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("inactive"));
        assert!(lines[1].contains("manual"));
        assert!(lines[1].contains("812.5"));
    }

    #[test]
    fn test_render_json() {
        let json = render(&EuroSnapshot::new(7), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["id"], 7);
    }
}
