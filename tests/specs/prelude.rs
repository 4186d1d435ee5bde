// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for daemon specs.

pub use std::sync::atomic::{AtomicUsize, Ordering};
pub use std::sync::Arc;
pub use std::time::Duration;

pub use async_trait::async_trait;
pub use hearth_daemon::{
    client::Client, Daemon, DaemonError, DaemonHooks, HookError, Session, SocketHooks, Verdict,
};
pub use serial_test::serial;
pub use tempfile::tempdir;

/// Upper bound for spec waits.
pub const SPEC_WAIT_MAX_MS: u64 = 5_000;

/// Poll `cond` every 10 ms until it holds or `max_ms` elapses.
pub async fn wait_for(max_ms: u64, cond: impl Fn() -> bool) -> bool {
    let deadline = std::time::Instant::now() + Duration::from_millis(max_ms);
    while std::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

/// Records daemon lifecycle hook invocations.
#[derive(Default)]
pub struct Recorder {
    pub startups: AtomicUsize,
    pub reconfigures: AtomicUsize,
    pub shutdowns: AtomicUsize,
}

impl DaemonHooks for Recorder {
    fn startup(&self) {
        self.startups.fetch_add(1, Ordering::SeqCst);
    }

    fn reconfigure(&self) {
        self.reconfigures.fetch_add(1, Ordering::SeqCst);
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

impl Recorder {
    pub fn started(&self) -> bool {
        self.startups.load(Ordering::SeqCst) > 0
    }
}

/// Echo hooks: every frame is written straight back. A configurable
/// poison frame makes the read hook fail instead.
#[derive(Default)]
pub struct EchoHooks {
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub fail_on: Option<&'static [u8]>,
}

#[async_trait]
impl SocketHooks for EchoHooks {
    fn connect(&self, _session: &Session) -> Verdict {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Verdict::Accept
    }

    fn disconnect(&self, _session: &Session) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    async fn read(&self, session: &Session, frame: Vec<u8>) -> Result<(), HookError> {
        if self.fail_on.is_some_and(|poison| poison == frame.as_slice()) {
            return Err(HookError::new("poison frame"));
        }
        session.write(&frame).await.map_err(|e| HookError::new(e.to_string()))
    }
}

/// Hooks that reject every connection.
#[derive(Default)]
pub struct RejectHooks {
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub reads: AtomicUsize,
}

#[async_trait]
impl SocketHooks for RejectHooks {
    fn connect(&self, _session: &Session) -> Verdict {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Verdict::Reject
    }

    fn disconnect(&self, _session: &Session) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    async fn read(&self, _session: &Session, _frame: Vec<u8>) -> Result<(), HookError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Err(HookError::new("rejected connections never read"))
    }
}
