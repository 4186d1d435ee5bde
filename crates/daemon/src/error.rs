// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-scoped errors.
//!
//! Session-scoped failures never surface here; they destroy their one
//! session (see [`crate::SessionError`]). Everything in this enum either
//! rejects a `setup`/`add_listener` call or ends a `run`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by [`crate::Daemon`] operations.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Daemon already running")]
    AlreadyRunning,

    #[error("Failed to bind socket at {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to listen on socket at {path}: {source}")]
    Listen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Listener on {path} failed: {source}")]
    ListenerFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Watched pid {0} is gone")]
    PidGone(i32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
