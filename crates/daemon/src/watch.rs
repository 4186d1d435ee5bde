// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parent-process watchdog.
//!
//! A supervised daemon's liveness is tied to its parent: when the watched
//! pid disappears, the daemon shuts down. The probe is the null signal —
//! an existence check that delivers nothing.

use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::daemon::Event;

/// Delay before the first liveness probe.
const STARTUP_DELAY: Duration = Duration::from_secs(1);

/// Interval between liveness probes.
const PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// Outcome of a single liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    Alive,
    Gone,
    /// EPERM and friends: the pid may well exist, we just could not tell.
    Unknown,
}

fn probe(pid: i32) -> Probe {
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => Probe::Alive,
        Err(Errno::ESRCH) => Probe::Gone,
        Err(_) => Probe::Unknown,
    }
}

/// Probe `pid` until it disappears, then report [`Event::PidGone`].
///
/// Transient probe failures are logged and rescheduled; only ESRCH is
/// terminal.
pub(crate) async fn watch(pid: i32, events: mpsc::Sender<Event>) {
    tokio::time::sleep(STARTUP_DELAY).await;
    loop {
        match probe(pid) {
            Probe::Alive => {}
            Probe::Gone => {
                error!(pid, "watched pid is gone, shutting down");
                let _ = events.send(Event::PidGone(pid)).await;
                return;
            }
            Probe::Unknown => warn!(pid, "failed to check watched pid"),
        }
        tokio::time::sleep(PROBE_INTERVAL).await;
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
