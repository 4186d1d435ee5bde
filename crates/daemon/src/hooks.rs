// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook surfaces implemented by hosting applications.
//!
//! A hook table is a trait implementation carrying its own state: the
//! framework holds each table as an `Arc<dyn …>` and never inspects it
//! beyond calling the methods. Every hook is optional except
//! [`SocketHooks::read`], which is what a socket exists to do.
//!
//! All hooks are panic-contained; a panicking hook counts as the
//! equivalent failure for its scope and cannot take the daemon down.

use async_trait::async_trait;
use thiserror::Error;

use crate::session::Session;

/// Decision returned by [`SocketHooks::connect`] for a new connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep the connection; the session starts serving frames.
    Accept,
    /// Close the connection immediately. No further hooks run for it and
    /// nothing is logged as an error.
    Reject,
}

/// Error returned by [`SocketHooks::read`] to tear down its session.
///
/// The message is logged at debug level; the failure stays confined to the
/// one session.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HookError(String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Daemon lifecycle hooks.
///
/// All methods are synchronous, default to no-ops, and are invoked from
/// the daemon's run task only — `startup`, `reconfigure` and `shutdown`
/// can never overlap each other.
pub trait DaemonHooks: Send + Sync {
    /// Called once when the daemon starts serving, before any connection
    /// is accepted.
    fn startup(&self) {}

    /// Called for each coalesced SIGHUP/SIGUSR1 delivery while serving.
    fn reconfigure(&self) {}

    /// Called exactly once per `startup` during shutdown, after every
    /// session and listener has been torn down.
    fn shutdown(&self) {}
}

/// For daemons that only serve sockets and need no lifecycle hooks.
impl DaemonHooks for () {}

/// Per-socket hooks, one table per listening endpoint.
///
/// For a given session the events are totally ordered: `connect` first,
/// then `read` calls one at a time (the framework never pipelines user
/// work on a connection), then at most one `disconnect`.
#[async_trait]
pub trait SocketHooks: Send + Sync {
    /// Screen a new connection. Runs before any frame is read.
    fn connect(&self, session: &Session) -> Verdict {
        let _ = session;
        Verdict::Accept
    }

    /// The session is going away: the peer closed, an I/O operation
    /// failed, or a `read` call returned an error. Not called for
    /// rejected connections or for sessions discarded by daemon shutdown.
    fn disconnect(&self, session: &Session) {
        let _ = session;
    }

    /// Handle one inbound frame. Returning an error destroys the session;
    /// [`Session::write`] on the handle queues outbound frames.
    async fn read(&self, session: &Session, frame: Vec<u8>) -> Result<(), HookError>;
}
