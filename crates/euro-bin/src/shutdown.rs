// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Graceful shutdown coordination.
//!
//! The poll loop watches a [`ShutdownCoordinator`]; SIGINT or SIGTERM
//! stops it between polls so the network can be shut down cleanly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

// =============================================================================
// ShutdownCoordinator
// =============================================================================

/// Broadcasts a one-time shutdown request.
///
/// ```ignore
/// use euro_bin::shutdown::ShutdownCoordinator;
///
/// let coordinator = ShutdownCoordinator::new();
/// coordinator.listen_for_signals();
///
/// let mut rx = coordinator.subscribe();
/// tokio::select! {
///     _ = rx.recv() => println!("stopping"),
///     _ = poll_once() => {}
/// }
/// ```
#[derive(Clone)]
pub struct ShutdownCoordinator {
    sender: broadcast::Sender<()>,
    shutdown_initiated: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Creates a new shutdown coordinator.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribes to shutdown notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Returns a token for polling the shutdown state.
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            shutdown_initiated: Arc::clone(&self.shutdown_initiated),
        }
    }

    /// Initiates shutdown. Only the first call notifies subscribers.
    pub fn initiate_shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("Shutdown initiated");
            let _ = self.sender.send(());
        }
    }

    /// Returns true if shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Spawns a task that initiates shutdown on the first OS signal.
    pub fn listen_for_signals(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            if wait_for_signal().await {
                coordinator.initiate_shutdown();
            }
        })
    }

    /// Waits until shutdown is initiated.
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        if self.is_shutdown_initiated() {
            return;
        }
        let _ = rx.recv().await;
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("shutdown_initiated", &self.is_shutdown_initiated())
            .finish()
    }
}

/// Waits for SIGINT or SIGTERM (Ctrl-C elsewhere). Returns `false` if no
/// handler could be installed.
async fn wait_for_signal() -> bool {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                return ctrl_c().await;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
                true
            }
            received = ctrl_c() => received,
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await
    }
}

async fn ctrl_c() -> bool {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl-C");
            true
        }
        Err(e) => {
            warn!(error = %e, "Failed to register Ctrl-C handler");
            false
        }
    }
}

// =============================================================================
// ShutdownToken
// =============================================================================

/// Cheap handle for checking whether shutdown was requested.
#[derive(Clone, Debug)]
pub struct ShutdownToken {
    shutdown_initiated: Arc<AtomicBool>,
}

impl ShutdownToken {
    /// Returns true if shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Tests
// =============================================================================
