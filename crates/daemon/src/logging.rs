// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup for hosted daemons.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a default stderr subscriber for the process.
///
/// Honors `RUST_LOG`, defaulting to `info`. A no-op when the embedding
/// application already installed a subscriber — the host keeps control of
/// its logging sink and the daemon's events flow into it.
pub(crate) fn init(name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(daemon = name, "logging initialized");
    }
}
