// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hearth-daemon: a Unix-domain-socket server framework for local daemons.
//!
//! A daemon owns one or more listening sockets, exchanges length-prefixed
//! frames with local clients, and serves until the first terminal event:
//! an operator shutdown signal, an external stop request, a fatal listener
//! error, or the disappearance of a watched parent process.
//!
//! Architecture:
//! - Run loop: [`Daemon::run`] dispatches signals, watcher and listener
//!   events on one task; daemon hooks only ever run there
//! - Accept loops: one spawned task per listener; each accepted connection
//!   becomes a session task parented to its listener
//!
//! The payload protocol is the host's business: hooks see whole frames of
//! opaque bytes (framing lives in `hearth-wire`).

pub mod client;
mod daemon;
mod error;
mod hooks;
mod listener;
mod logging;
mod pidfile;
mod session;
mod signals;
mod watch;

pub use daemon::{Daemon, StopHandle};
pub use error::DaemonError;
pub use hooks::{DaemonHooks, HookError, SocketHooks, Verdict};
pub use pidfile::{PidFile, PidFileError};
pub use session::{Session, SessionError, SessionId};

pub use hearth_wire::WireError;
