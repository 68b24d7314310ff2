// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Network Integration Tests
//!
//! End-to-end tests of the controller network over a mock RTU line:
//!
//! - Probing and port discovery
//! - Output and setpoint commands
//! - Snapshot polling and recording
//! - Fail-safe shutdown and release
//!
//! ## Test Categories
//!
//! - `test_probe_*`: Slave probing on one port
//! - `test_discover_*`: Port discovery through the connection manager
//! - `test_command_*`: Loop commands
//! - `test_poll_*`: Snapshot polling
//! - `test_shutdown_*`: Fail-safe shutdown
//! - `test_bus_*`: Request serialization

use std::time::Duration;

use euro_modbus::{
    address, ConnectionError, ConnectionManager, ControlMode, ErrorKind, EuroError, EuroNetwork,
    InvalidArgument, IoError, JsonLinesSink, LoopId, Origin, RecordingReporter, RegisterField,
    SerialPortKind, SnapshotSink, SnapshotTable, COMMAND_PAYLOAD_BYTES, SENTINEL,
};
use euro_tests::prelude::*;

// =============================================================================
// Test Helpers
// =============================================================================

fn mode_addr(loop_id: LoopId) -> u16 {
    address(loop_id, RegisterField::ManAutoFlag)
}

fn output_addr(loop_id: LoopId) -> u16 {
    address(loop_id, RegisterField::TargetOp)
}

fn setpoint_addr(loop_id: LoopId) -> u16 {
    address(loop_id, RegisterField::TargetSp)
}

fn assert_closed_error(error: &EuroError) {
    assert!(
        matches!(error, EuroError::InvalidArgument(InvalidArgument::NetworkClosed)),
        "expected NetworkClosed, got {:?}",
        error
    );
}

// =============================================================================
// Probe Tests
// =============================================================================

#[tokio::test]
async fn test_probe_fills_slots_in_ascending_order() {
    init_test_logging();
    let bus = MockBus::with_responders([2, 5, 7, 9]);
    let mut network = EuroNetwork::new(bus.clone(), "/dev/ttyUSB0");

    let found = network.probe(1..=10).await.unwrap();

    assert_eq!(found, 3);
    assert_eq!(network.slot_ids(), [2, 5, 7]);
    assert_eq!(network.connected_flags(), [true, true, true]);
    assert!(!network.is_connected(9));
    // IDs 8..=10 are never asked once the slots are full.
    assert_eq!(bus.read_count(), 7);

    network.release().await.unwrap();
}

#[tokio::test]
async fn test_probe_partial_slots() {
    let fixture = NetworkFixture::probed(&[3], 1..=5).await;

    assert_eq!(fixture.network.slot_ids(), [3, 0, 0]);
    assert_eq!(fixture.network.connected_flags(), [true, false, false]);
    assert_eq!(fixture.network.connected_ids(), vec![3]);

    fixture.network.release().await.unwrap();
}

#[tokio::test]
async fn test_probe_uses_loop1_process_value() {
    let bus = MockBus::with_responders([1]);
    bus.fail_reads_at(address(LoopId::Loop1, RegisterField::Pv));
    let mut network = EuroNetwork::new(bus, "/dev/ttyUSB0");

    let error = network.probe(1..=3).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Connection);
}

#[tokio::test]
async fn test_probe_no_responder_clears_flags() {
    let mut fixture = NetworkFixture::probed(&[1, 2], 1..=3).await;
    assert_eq!(fixture.network.connected_ids(), vec![1, 2]);

    let error = fixture.network.probe(4..=10).await.unwrap_err();

    assert!(matches!(
        error,
        EuroError::Connection(ConnectionError::NoResponder { start: 4, end: 10, .. })
    ));
    assert_eq!(fixture.network.connected_flags(), [false; 3]);
    assert!(fixture.network.connected_ids().is_empty());

    fixture.network.release().await.unwrap();
}

#[tokio::test]
async fn test_probe_rejects_bad_ranges() {
    let bus = MockBus::with_responders([1]);
    let mut network = EuroNetwork::new(bus.clone(), "/dev/ttyUSB0");

    let broadcast = network.probe(0..=3).await.unwrap_err();
    assert!(matches!(
        broadcast,
        EuroError::InvalidArgument(InvalidArgument::BroadcastId)
    ));

    #[allow(clippy::reversed_empty_ranges)]
    let empty = network.probe(5..=3).await.unwrap_err();
    assert_eq!(empty.kind(), ErrorKind::InvalidArgument);

    assert_eq!(bus.read_count(), 0);
}

// =============================================================================
// Discovery Tests
// =============================================================================

#[tokio::test]
async fn test_discover_filters_by_port_kind() {
    let devices = DeviceDirFixture::with_devices(&["ttyUSB0", "ttyS0", "null"]);
    let opener = MockOpener::new().with_line("ttyUSB0", MockBus::with_responders([2]));
    let manager = devices.manager(opener.clone());

    let network = manager.discover(SerialPortKind::TtyUsb, 1..=3).await.unwrap();

    assert_eq!(network.port(), devices.device("ttyUSB0"));
    assert_eq!(network.display_name(), "ttyUSB0");
    assert_eq!(network.connected_ids(), vec![2]);
    assert_eq!(opener.opened(), vec![devices.device("ttyUSB0")]);

    network.release().await.unwrap();
}

#[tokio::test]
async fn test_discover_uses_configured_kind() {
    let devices = DeviceDirFixture::with_devices(&["ttyUSB0", "ttyS1"]);
    let opener = MockOpener::new().with_line("ttyS1", MockBus::with_responders([1]));
    let manager = ConnectionManager::new(opener.clone(), {
        let mut settings = devices.settings();
        settings.port_kind = SerialPortKind::TtyS;
        settings
    });

    let network = manager.discover_configured(1..=3).await.unwrap();

    assert_eq!(network.port(), devices.device("ttyS1"));
    assert_eq!(opener.opened(), vec![devices.device("ttyS1")]);

    network.release().await.unwrap();
}

#[tokio::test]
async fn test_discover_skips_silent_ports() {
    let devices = DeviceDirFixture::with_devices(&["ttyUSB0", "ttyUSB1"]);
    let silent = MockBus::new();
    let opener = MockOpener::new()
        .with_line("ttyUSB0", silent.clone())
        .with_line("ttyUSB1", MockBus::with_responders([1, 2, 3]));
    let manager = devices.manager(opener.clone());

    let network = manager.discover(SerialPortKind::TtyUsb, 1..=3).await.unwrap();

    assert_eq!(network.port(), devices.device("ttyUSB1"));
    assert_eq!(network.connected_ids(), vec![1, 2, 3]);

    // Directory order decides whether the silent port was tried first.
    if opener.opened().contains(&devices.device("ttyUSB0")) {
        assert!(silent.is_closed());
        assert_eq!(silent.disconnect_count(), 1);
        assert_eq!(silent.write_count(), 0);
    } else {
        assert!(!silent.is_closed());
    }

    network.release().await.unwrap();
}

#[tokio::test]
async fn test_discover_no_responder_closes_every_port() {
    let devices = DeviceDirFixture::with_devices(&["ttyUSB0", "ttyUSB1"]);
    let first = MockBus::new();
    let second = MockBus::new();
    let opener = MockOpener::new()
        .with_line("ttyUSB0", first.clone())
        .with_line("ttyUSB1", second.clone());
    let reporter = std::sync::Arc::new(RecordingReporter::new());
    let manager = devices.manager(opener).with_reporter(reporter.clone());

    let error = manager
        .discover(SerialPortKind::TtyUsb, 1..=10)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        EuroError::Connection(ConnectionError::NoResponder { start: 1, end: 10, ports: 2 })
    ));
    assert_eq!(first.disconnect_count(), 1);
    assert_eq!(second.disconnect_count(), 1);

    let reports = reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].origin, Origin::ConnectionManager);
    assert_eq!(reports[0].operation, "discover");
}

#[tokio::test]
async fn test_discover_no_matching_port() {
    let devices = DeviceDirFixture::with_devices(&["ttyS0", "console"]);
    let manager = devices.manager(MockOpener::new());

    let error = manager
        .discover(SerialPortKind::TtyUsb, 1..=3)
        .await
        .unwrap_err();

    match error {
        EuroError::Connection(ConnectionError::NoMatchingPort { dir, prefix }) => {
            assert_eq!(dir, devices.path());
            assert_eq!(prefix, "ttyUSB");
        }
        other => panic!("Expected NoMatchingPort, got {:?}", other),
    }
}

#[tokio::test]
async fn test_discover_unreadable_directory() {
    let manager = ConnectionManager::new(MockOpener::new(), {
        let mut settings = DeviceDirFixture::with_devices(&[]).settings();
        settings.device_dir = "/nonexistent/euro-dev".into();
        settings
    });

    let error = manager
        .discover(SerialPortKind::TtyUsb, 1..=3)
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        EuroError::Connection(ConnectionError::DirectoryUnreadable { .. })
    ));
}

#[tokio::test]
async fn test_discover_skips_ports_that_fail_to_open() {
    let devices = DeviceDirFixture::with_devices(&["ttyUSB0", "ttyUSB1"]);
    let opener = MockOpener::new()
        .fail_open("ttyUSB0")
        .with_line("ttyUSB1", MockBus::with_responders([1]));
    let manager = devices.manager(opener.clone());

    let network = manager.discover(SerialPortKind::TtyUsb, 1..=3).await.unwrap();

    assert_eq!(network.port(), devices.device("ttyUSB1"));
    assert!(!opener.opened().contains(&devices.device("ttyUSB0")));

    network.release().await.unwrap();
}

#[tokio::test]
async fn test_discover_reports_open_failure_when_nothing_opens() {
    let devices = DeviceDirFixture::with_devices(&["ttyUSB0"]);
    let manager = devices.manager(MockOpener::new().fail_open("ttyUSB0"));

    let error = manager
        .discover(SerialPortKind::TtyUsb, 1..=3)
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        EuroError::Connection(ConnectionError::SerialPortNotFound { .. })
    ));
}

// =============================================================================
// Command Tests
// =============================================================================

#[tokio::test]
async fn test_command_set_output_writes_mode_then_value() {
    let fixture = NetworkFixture::full().await;

    let written = fixture
        .network
        .set_output(2, LoopId::Loop3, 35.0)
        .await
        .unwrap();

    assert_eq!(written, COMMAND_PAYLOAD_BYTES);
    assert_eq!(
        fixture.bus.write_history(),
        vec![
            WriteRecord {
                slave: 2,
                address: mode_addr(LoopId::Loop3),
                value: ControlMode::Manual.register_value(),
            },
            WriteRecord {
                slave: 2,
                address: output_addr(LoopId::Loop3),
                value: 35,
            },
        ]
    );

    fixture.network.release().await.unwrap();
}

#[tokio::test]
async fn test_command_set_output_bounds() {
    let fixture = NetworkFixture::single().await;

    for out_pow in [-0.1, 100.1, f64::NAN] {
        let error = fixture
            .network
            .set_output(1, LoopId::Loop1, out_pow)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Range, "out_pow = {}", out_pow);
    }
    assert_eq!(fixture.bus.write_count(), 0);

    for out_pow in [0.0, 100.0] {
        fixture
            .network
            .set_output(1, LoopId::Loop1, out_pow)
            .await
            .unwrap();
    }
    assert_eq!(
        fixture
            .bus
            .writes_to(output_addr(LoopId::Loop1))
            .iter()
            .map(|w| w.value)
            .collect::<Vec<_>>(),
        vec![0, 100]
    );

    let reports = fixture.reporter.reports();
    assert_eq!(reports.len(), 3);
    assert!(reports
        .iter()
        .all(|r| r.origin == Origin::LoopController && r.operation == "set_output"));

    fixture.network.release().await.unwrap();
}

#[tokio::test]
async fn test_command_set_setpoint_scales_and_selects_auto() {
    let fixture = NetworkFixture::single().await;

    let written = fixture
        .network
        .set_setpoint(1, LoopId::Loop2, 5000.0)
        .await
        .unwrap();

    assert_eq!(written, 2);
    assert_eq!(
        fixture.bus.register(1, mode_addr(LoopId::Loop2)),
        Some(ControlMode::Auto.register_value())
    );
    assert_eq!(fixture.bus.register(1, setpoint_addr(LoopId::Loop2)), Some(50000));

    let error = fixture
        .network
        .set_setpoint(1, LoopId::Loop2, 5000.1)
        .await
        .unwrap_err();
    assert!(matches!(error, EuroError::Range(_)));
    assert_eq!(fixture.bus.write_count(), 2);

    fixture.network.release().await.unwrap();
}

#[tokio::test]
async fn test_command_mode_failure_skips_value_write() {
    let fixture = NetworkFixture::single().await;
    fixture.bus.fail_writes_at(mode_addr(LoopId::Loop1));

    let error = fixture
        .network
        .set_output(1, LoopId::Loop1, 20.0)
        .await
        .unwrap_err();

    assert!(matches!(error, EuroError::Io(IoError::Exception { .. })));
    assert!(fixture.bus.writes_to(output_addr(LoopId::Loop1)).is_empty());
    assert_eq!(fixture.reporter.len(), 1);

    fixture.network.release().await.unwrap();
}

#[tokio::test]
async fn test_command_value_failure_after_mode_write() {
    let fixture = NetworkFixture::single().await;
    fixture.bus.fail_writes_at(setpoint_addr(LoopId::Loop1));

    let error = fixture
        .network
        .set_setpoint(1, LoopId::Loop1, 300.0)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Io);
    // The mode change is not rolled back.
    assert_eq!(fixture.bus.writes_to(mode_addr(LoopId::Loop1)).len(), 1);

    fixture.network.release().await.unwrap();
}

#[tokio::test]
async fn test_command_unknown_controller() {
    let fixture = NetworkFixture::probed(&[1, 7], 1..=10).await;

    let error = fixture
        .network
        .set_output(4, LoopId::Loop1, 10.0)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        EuroError::InvalidArgument(InvalidArgument::UnknownController { id: 4 })
    ));
    assert_eq!(fixture.bus.write_count(), 0);

    fixture
        .network
        .set_output(7, LoopId::Loop1, 10.0)
        .await
        .unwrap();

    fixture.network.release().await.unwrap();
}

#[tokio::test]
async fn test_command_range_checked_before_closed() {
    let fixture = NetworkFixture::single().await;
    fixture.network.shutdown().await.unwrap();

    let range = fixture
        .network
        .set_output(1, LoopId::Loop1, 150.0)
        .await
        .unwrap_err();
    assert_eq!(range.kind(), ErrorKind::Range);

    let closed = fixture
        .network
        .set_output(1, LoopId::Loop1, 50.0)
        .await
        .unwrap_err();
    assert_closed_error(&closed);

    let unknown_after_close = fixture
        .network
        .set_setpoint(9, LoopId::Loop1, 50.0)
        .await
        .unwrap_err();
    assert_closed_error(&unknown_after_close);
}

#[tokio::test]
async fn test_command_read_mode_and_error_value() {
    let fixture = NetworkFixture::single().await;
    fixture
        .bus
        .set_register(1, mode_addr(LoopId::Loop2), ControlMode::Manual.register_value());
    fixture
        .bus
        .set_register(1, address(LoopId::Loop2, RegisterField::ErrVal), 12);

    assert_eq!(
        fixture.network.read_mode(1, LoopId::Loop2).await.unwrap(),
        ControlMode::Manual
    );
    assert_eq!(
        fixture.network.read_error_value(1, LoopId::Loop2).await.unwrap(),
        12
    );

    fixture.bus.set_register(1, mode_addr(LoopId::Loop3), 7);
    let error = fixture.network.read_mode(1, LoopId::Loop3).await.unwrap_err();
    assert!(matches!(
        error,
        EuroError::Io(IoError::UnexpectedValue { slave: 1, raw: 7, .. })
    ));

    fixture.network.release().await.unwrap();
}

// =============================================================================
// Poll Tests
// =============================================================================

#[tokio::test]
async fn test_poll_decodes_every_loop() {
    let fixture = NetworkFixture::single().await;
    for loop_id in LoopId::ALL {
        LoopRegisters::heating().install(&fixture.bus, 1, loop_id);
    }

    let mut table = SnapshotTable::for_network(&fixture.network);
    let summary = fixture.network.poll_all(&mut table).await.unwrap();

    assert_eq!(summary.attempted, 12);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.loops_refreshed, 3);

    let snapshot = table.get(1).unwrap();
    assert!(snapshot.polled_at.is_some());
    for state in &snapshot.loops {
        assert!(state.active);
        assert_eq!(state.temperature, 812.5);
        assert_eq!(state.setpoint, 850.0);
        assert_eq!(state.output, 42.0);
        assert_eq!(state.mode, ControlMode::Auto);
    }

    fixture.network.release().await.unwrap();
}

#[tokio::test]
async fn test_poll_partial_failure_keeps_other_loops() {
    let fixture = NetworkFixture::single().await;
    for loop_id in LoopId::ALL {
        LoopRegisters::heating().install(&fixture.bus, 1, loop_id);
    }
    fixture
        .bus
        .fail_reads_at(address(LoopId::Loop2, RegisterField::WkgOp));

    let mut table = SnapshotTable::new();
    let error = fixture.network.poll_all(&mut table).await.unwrap_err();

    match error {
        EuroError::Io(IoError::Poll { failed, attempted, .. }) => {
            assert_eq!(failed, 1);
            assert_eq!(attempted, 12);
        }
        other => panic!("Expected Poll error, got {:?}", other),
    }

    let snapshot = table.get(1).unwrap();
    assert!(snapshot.loop_state(LoopId::Loop1).active);
    assert!(snapshot.loop_state(LoopId::Loop3).active);

    let loop2 = snapshot.loop_state(LoopId::Loop2);
    assert!(!loop2.active);
    assert_eq!(loop2.temperature, 812.5);
    assert_eq!(loop2.output, SENTINEL);

    let reports = fixture.reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].origin, Origin::StateSnapshot);

    fixture.network.release().await.unwrap();
}

#[tokio::test]
async fn test_poll_failure_keeps_previous_loop_values() {
    let fixture = NetworkFixture::single().await;
    for loop_id in LoopId::ALL {
        LoopRegisters::heating().install(&fixture.bus, 1, loop_id);
    }

    let mut table = SnapshotTable::for_network(&fixture.network);
    fixture.network.poll_all(&mut table).await.unwrap();
    assert!(table.get(1).unwrap().loop_state(LoopId::Loop2).active);

    fixture
        .bus
        .set_register(1, address(LoopId::Loop2, RegisterField::Pv), 8200);
    fixture
        .bus
        .set_register(1, address(LoopId::Loop2, RegisterField::WkgOp), 55);
    fixture
        .bus
        .fail_reads_at(address(LoopId::Loop2, RegisterField::WkgOp));

    let error = fixture.network.poll_all(&mut table).await.unwrap_err();
    assert!(matches!(
        error,
        EuroError::Io(IoError::Poll { failed: 1, attempted: 12, .. })
    ));

    let loop2 = table.get(1).unwrap().loop_state(LoopId::Loop2);
    assert!(loop2.active);
    assert_eq!(loop2.output, 42.0);
    assert_eq!(loop2.temperature, 820.0);
    assert_eq!(loop2.setpoint, 850.0);

    fixture.network.release().await.unwrap();
}

#[tokio::test]
async fn test_poll_reads_negative_process_value() {
    let fixture = NetworkFixture::single().await;
    LoopRegisters::heating().install(&fixture.bus, 1, LoopId::Loop1);
    fixture
        .bus
        .set_register(1, address(LoopId::Loop1, RegisterField::Pv), 0xFF9C);

    let mut table = SnapshotTable::for_network(&fixture.network);
    fixture.network.poll_all(&mut table).await.unwrap();

    let loop1 = table.get(1).unwrap().loop_state(LoopId::Loop1);
    assert_eq!(loop1.temperature, -10.0);
    assert_eq!(loop1.setpoint, 850.0);

    fixture.network.release().await.unwrap();
}

#[tokio::test]
async fn test_poll_unexpected_mode_value() {
    let fixture = NetworkFixture::single().await;
    LoopRegisters::heating().install(&fixture.bus, 1, LoopId::Loop1);
    fixture.bus.set_register(1, mode_addr(LoopId::Loop1), 3);

    let mut table = SnapshotTable::new();
    let error = fixture.network.poll_all(&mut table).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Io);

    let loop1 = table.get(1).unwrap().loop_state(LoopId::Loop1);
    assert!(!loop1.active);
    assert_eq!(loop1.temperature, 812.5);

    fixture.network.release().await.unwrap();
}

#[tokio::test]
async fn test_poll_reset_restores_sentinels() {
    let fixture = NetworkFixture::single().await;
    LoopRegisters::heating().install(&fixture.bus, 1, LoopId::Loop1);

    let mut table = SnapshotTable::for_network(&fixture.network);
    fixture.network.poll_all(&mut table).await.unwrap();
    assert!(table.get(1).unwrap().is_active());

    table.reset(1).unwrap();
    let snapshot = table.get(1).unwrap();
    assert!(!snapshot.is_active());
    assert!(snapshot.polled_at.is_none());
    assert!(snapshot
        .loops
        .iter()
        .all(|s| s.temperature == SENTINEL && s.setpoint == SENTINEL && s.output == SENTINEL));

    let error = table.reset(9).unwrap_err();
    assert!(matches!(
        error,
        EuroError::InvalidArgument(InvalidArgument::UntrackedSnapshot { id: 9 })
    ));

    fixture.network.release().await.unwrap();
}

#[tokio::test]
async fn test_poll_after_shutdown() {
    let fixture = NetworkFixture::single().await;
    fixture.network.shutdown().await.unwrap();

    let mut table = SnapshotTable::new();
    let error = fixture.network.poll_all(&mut table).await.unwrap_err();
    assert_closed_error(&error);
}

#[tokio::test]
async fn test_poll_records_json_lines() {
    let fixture = NetworkFixture::probed(&[1, 2], 1..=3).await;
    LoopRegisters::heating().install(&fixture.bus, 2, LoopId::Loop1);

    let mut table = SnapshotTable::for_network(&fixture.network);
    fixture.network.poll_all(&mut table).await.unwrap();

    let mut sink = JsonLinesSink::new(Vec::new());
    assert_eq!(sink.accept_all(&table).unwrap(), 2);

    let output = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<serde_json::Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["id"], 1);
    assert_eq!(lines[1]["id"], 2);
    assert_eq!(lines[1]["loops"][0]["temperature"], 812.5);

    fixture.network.release().await.unwrap();
}

// =============================================================================
// Shutdown Tests
// =============================================================================

#[tokio::test]
async fn test_shutdown_zeroes_every_loop_in_manual() {
    let fixture = NetworkFixture::full().await;

    let outcome = fixture.network.shutdown().await.unwrap();

    assert!(!outcome.already_closed);
    assert_eq!(outcome.loops_zeroed, 9);
    assert_eq!(outcome.failures, 0);

    let history = fixture.bus.write_history();
    assert_eq!(history.len(), 18);
    for (i, pair) in history.chunks(2).enumerate() {
        let loop_id = LoopId::ALL[i % 3];
        assert_eq!(pair[0].slave, pair[1].slave);
        assert_eq!(pair[0].address, mode_addr(loop_id));
        assert_eq!(pair[0].value, ControlMode::Manual.register_value());
        assert_eq!(pair[1].address, output_addr(loop_id));
        assert_eq!(pair[1].value, 0);
    }

    assert!(fixture.bus.is_closed());
    assert!(!fixture.network.is_open().await);
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let fixture = NetworkFixture::single().await;

    fixture.network.shutdown().await.unwrap();
    let second = fixture.network.shutdown().await.unwrap();

    assert!(second.already_closed);
    assert_eq!(second.loops_zeroed, 0);
    assert_eq!(fixture.bus.disconnect_count(), 1);
    assert_eq!(fixture.bus.write_count(), 6);
}

#[tokio::test]
async fn test_shutdown_continues_past_failures() {
    let fixture = NetworkFixture::full().await;
    fixture.bus.fail_writes_at(mode_addr(LoopId::Loop2));

    let outcome = fixture.network.shutdown().await.unwrap();

    assert_eq!(outcome.failures, 3);
    assert_eq!(outcome.loops_zeroed, 6);
    assert!(fixture.bus.writes_to(output_addr(LoopId::Loop2)).is_empty());
    assert_eq!(fixture.bus.writes_to(output_addr(LoopId::Loop3)).len(), 3);
    assert_eq!(fixture.bus.disconnect_count(), 1);

    let reports = fixture.reporter.reports();
    assert_eq!(reports.len(), 3);
    assert!(reports
        .iter()
        .all(|r| r.origin == Origin::ConnectionManager && r.operation == "shutdown"));
}

#[tokio::test]
async fn test_shutdown_surfaces_close_failure() {
    let fixture = NetworkFixture::single().await;
    fixture.bus.fail_disconnect(true);

    let error = fixture.network.shutdown().await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Io);
    assert_eq!(fixture.bus.write_count(), 6);
    assert!(!fixture.network.is_open().await);
}

#[tokio::test]
async fn test_shutdown_release_keeps_commanded_values() {
    let fixture = NetworkFixture::single().await;
    fixture
        .network
        .set_output(1, LoopId::Loop1, 35.0)
        .await
        .unwrap();

    assert!(fixture.network.release().await.unwrap());
    assert!(!fixture.network.release().await.unwrap());

    assert_eq!(fixture.bus.register(1, output_addr(LoopId::Loop1)), Some(35));
    assert_eq!(fixture.bus.write_count(), 2);
    assert_eq!(fixture.bus.disconnect_count(), 1);

    let outcome = fixture.network.shutdown().await.unwrap();
    assert!(outcome.already_closed);
}

// =============================================================================
// Bus Serialization Tests
// =============================================================================

#[tokio::test]
async fn test_bus_concurrent_commands_never_overlap() {
    let fixture = NetworkFixture::full().await;
    fixture.bus.set_latency(Duration::from_millis(2));
    let mut table = SnapshotTable::for_network(&fixture.network);

    let network = &fixture.network;
    let (a, b, c, poll) = tokio::join!(
        network.set_output(1, LoopId::Loop1, 10.0),
        network.set_setpoint(2, LoopId::Loop2, 400.0),
        network.set_output(3, LoopId::Loop3, 90.0),
        network.poll_all(&mut table),
    );

    assert_eq!(a.unwrap(), 2);
    assert_eq!(b.unwrap(), 2);
    assert_eq!(c.unwrap(), 2);
    assert!(poll.is_ok());
    assert_eq!(fixture.bus.overlapping_requests(), 0);

    // Each command's two writes stay adjacent.
    let history = fixture.bus.write_history();
    assert_eq!(history.len(), 6);
    for pair in history.chunks(2) {
        assert_eq!(pair[0].slave, pair[1].slave);
    }

    fixture.network.release().await.unwrap();
}

#[tokio::test]
async fn test_bus_shutdown_waits_for_in_flight_command() {
    let fixture = NetworkFixture::single().await;
    fixture.bus.set_latency(Duration::from_millis(5));

    let network = &fixture.network;
    let (command, outcome) = tokio::join!(
        network.set_output(1, LoopId::Loop1, 35.0),
        network.shutdown(),
    );

    assert_eq!(command.unwrap(), 2);
    assert_eq!(outcome.unwrap().loops_zeroed, 3);

    let values: Vec<u16> = fixture
        .bus
        .writes_to(output_addr(LoopId::Loop1))
        .iter()
        .map(|w| w.value)
        .collect();
    assert_eq!(values, vec![35, 0]);
    assert_eq!(fixture.bus.overlapping_requests(), 0);
}
