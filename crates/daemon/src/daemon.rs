// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level daemon orchestration.
//!
//! One-shot lifecycle: `setup` → `add_listener`* → `run` → returned. The
//! daemon exclusively owns its listeners, pid-file, signal router and
//! watcher; each listener owns its sessions. Destruction always flows
//! root-to-leaves, so any exit path collapses resources in order.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::DaemonError;
use crate::hooks::{DaemonHooks, SocketHooks};
use crate::listener::Listener;
use crate::logging;
use crate::pidfile::{PidFile, PidFileError};
use crate::signals::{SignalEvent, SignalRouter};
use crate::watch;

/// Internal events funnelled to the run loop from helper tasks. The first
/// terminal event wins; everything after the loop breaks is discarded.
#[derive(Debug)]
pub(crate) enum Event {
    ListenerFailed { path: PathBuf, source: std::io::Error },
    PidGone(i32),
}

/// Daemon lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initialized,
    Running,
    ShuttingDown,
    Done,
}

/// Handle for requesting an external stop of a running daemon.
///
/// Clonable and usable from any task. Stopping is a terminal event
/// equivalent to a shutdown signal; `run` returns `Ok`.
#[derive(Clone)]
pub struct StopHandle {
    cancel: CancellationToken,
}

impl StopHandle {
    /// Ask the daemon to shut down gracefully. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// A Unix-domain-socket server daemon.
pub struct Daemon {
    name: String,
    hooks: Arc<dyn DaemonHooks>,
    pidfile: Option<PidFile>,
    listeners: Vec<Listener>,
    stop: CancellationToken,
    state: State,
}

impl Daemon {
    /// Initialize logging and, when `pidfile` is given, enforce single
    /// instance by acquiring it. A held pid-file means another instance is
    /// live and yields [`DaemonError::AlreadyRunning`].
    pub fn setup(
        name: &str,
        pidfile: Option<&Path>,
        hooks: Arc<dyn DaemonHooks>,
    ) -> Result<Self, DaemonError> {
        logging::init(name);

        let pidfile = match pidfile {
            Some(path) => Some(PidFile::acquire(path).map_err(|e| match e {
                PidFileError::AlreadyHeld(_) => DaemonError::AlreadyRunning,
                PidFileError::Io(e) => DaemonError::Io(e),
            })?),
            None => None,
        };

        Ok(Self {
            name: name.to_owned(),
            hooks,
            pidfile,
            listeners: Vec::new(),
            stop: CancellationToken::new(),
            state: State::Initialized,
        })
    }

    /// Register one listening endpoint. The socket is bound and listening
    /// on return; accepting starts with [`Daemon::run`].
    ///
    /// When the daemon holds a pid-file, a stale socket at `path` is
    /// removed before binding — the pid-file proves no other instance owns
    /// it. Without a pid-file an existing path fails the bind.
    pub fn add_listener(
        &mut self,
        path: &Path,
        hooks: Arc<dyn SocketHooks>,
    ) -> Result<(), DaemonError> {
        let remove_before_bind = self.pidfile.is_some();
        let listener = Listener::bind(path, hooks, remove_before_bind)?;
        info!(daemon = %self.name, "listening on {}", path.display());
        self.listeners.push(listener);
        Ok(())
    }

    /// Handle for stopping this daemon from another task.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle { cancel: self.stop.clone() }
    }

    /// Serve until the first terminal event, then tear everything down.
    ///
    /// When `pid_watch > 1`, the daemon also watches that pid and treats
    /// its disappearance as terminal; any smaller value disables watching.
    ///
    /// Returns `Ok` for a shutdown signal or an external stop, an error
    /// for a vanished parent or a dead listener. The `shutdown` hook runs
    /// exactly once on every path, after all sessions and listeners are
    /// gone; the pid-file is released last.
    pub async fn run(mut self, pid_watch: i32) -> Result<(), DaemonError> {
        let mut router = SignalRouter::install()?;
        self.state = State::Running;

        info!(daemon = %self.name, pid = std::process::id(), "daemon started");
        catch_hook("startup", || self.hooks.startup());

        let (event_tx, mut event_rx) = mpsc::channel(8);

        let mut watcher: Option<JoinHandle<()>> = None;
        if pid_watch > 1 {
            watcher = Some(tokio::spawn(watch::watch(pid_watch, event_tx.clone())));
        }

        for listener in &mut self.listeners {
            listener.start(event_tx.clone());
        }

        let outcome = loop {
            tokio::select! {
                event = router.recv() => match event {
                    SignalEvent::Reconfigure => {
                        catch_hook("reconfigure", || self.hooks.reconfigure());
                    }
                    SignalEvent::Shutdown => break Ok(()),
                },
                event = event_rx.recv() => match event {
                    Some(Event::ListenerFailed { path, source }) => {
                        break Err(DaemonError::ListenerFailed { path, source });
                    }
                    Some(Event::PidGone(pid)) => break Err(DaemonError::PidGone(pid)),
                    // Unreachable while this scope holds `event_tx`;
                    // treated as a stop if it ever fires.
                    None => break Ok(()),
                },
                _ = self.stop.cancelled() => break Ok(()),
            }
        };

        if let Some(watcher) = watcher {
            watcher.abort();
        }
        self.shutdown().await;
        outcome
    }

    /// Collapse the ownership tree: listeners (and their sessions) in
    /// reverse registration order, then the `shutdown` hook, then the
    /// pid-file. Idempotent.
    async fn shutdown(&mut self) {
        if matches!(self.state, State::ShuttingDown | State::Done) {
            return;
        }
        self.state = State::ShuttingDown;

        info!(daemon = %self.name, "shutting down");
        while let Some(mut listener) = self.listeners.pop() {
            listener.teardown().await;
        }

        catch_hook("shutdown", || self.hooks.shutdown());

        if let Some(pidfile) = self.pidfile.as_mut() {
            pidfile.release();
        }
        self.state = State::Done;
    }
}

/// Run a daemon hook, containing panics so user code cannot take the
/// serving loop down.
fn catch_hook(name: &str, hook: impl FnOnce()) {
    if std::panic::catch_unwind(AssertUnwindSafe(hook)).is_err() {
        error!("{name} hook panicked");
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
