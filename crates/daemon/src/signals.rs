// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal routing.
//!
//! Raw signal numbers stop here: the router translates the four signals
//! the framework consumes into lifecycle events, so hooks never see a
//! signal. Deliveries that arrive while a previous event is being handled
//! coalesce into at most one pending event per stream.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::debug;

use crate::error::DaemonError;

/// Lifecycle event a delivered signal maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SignalEvent {
    /// SIGHUP / SIGUSR1: re-read configuration, keep serving.
    Reconfigure,
    /// SIGINT / SIGTERM: graceful shutdown.
    Shutdown,
}

// Signal delivery is process-global, so at most one router may be live in
// a process at a time. The flag clears when the router drops, allowing
// sequential daemons.
static ROUTER_INSTALLED: AtomicBool = AtomicBool::new(false);

pub(crate) struct SignalRouter {
    hangup: Signal,
    user1: Signal,
    interrupt: Signal,
    terminate: Signal,
}

impl SignalRouter {
    pub fn install() -> Result<Self, DaemonError> {
        if ROUTER_INSTALLED.swap(true, Ordering::SeqCst) {
            return Err(DaemonError::Config(
                "another daemon is already running in this process".to_string(),
            ));
        }

        match Self::subscribe() {
            Ok(router) => Ok(router),
            Err(e) => {
                ROUTER_INSTALLED.store(false, Ordering::SeqCst);
                Err(DaemonError::Io(e))
            }
        }
    }

    fn subscribe() -> std::io::Result<Self> {
        Ok(Self {
            hangup: signal(SignalKind::hangup())?,
            user1: signal(SignalKind::user_defined1())?,
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the next signal and translate it.
    pub async fn recv(&mut self) -> SignalEvent {
        tokio::select! {
            _ = self.hangup.recv() => {
                debug!("received SIGHUP");
                SignalEvent::Reconfigure
            }
            _ = self.user1.recv() => {
                debug!("received SIGUSR1");
                SignalEvent::Reconfigure
            }
            _ = self.interrupt.recv() => {
                debug!("received SIGINT");
                SignalEvent::Shutdown
            }
            _ = self.terminate.recv() => {
                debug!("received SIGTERM");
                SignalEvent::Shutdown
            }
        }
    }
}

impl Drop for SignalRouter {
    fn drop(&mut self) {
        ROUTER_INSTALLED.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;
