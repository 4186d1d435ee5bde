// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal framed client for daemon sockets.
//!
//! Enough to poke a hosted daemon from tests and demo programs: connect,
//! send a frame, receive a frame. Real clients speak the same wire format
//! with their own payload layer on top.

use std::path::Path;
use std::time::Duration;

use hearth_wire as wire;
use tokio::net::UnixStream;

/// Client connection to a daemon socket.
pub struct Client {
    stream: UnixStream,
}

impl Client {
    /// Connect to the daemon listening at `path`.
    pub async fn connect(path: &Path) -> std::io::Result<Self> {
        Ok(Self { stream: UnixStream::connect(path).await? })
    }

    /// Send one frame.
    pub async fn send(&mut self, frame: &[u8]) -> Result<(), wire::WireError> {
        wire::write_frame(&mut self.stream, frame).await
    }

    /// Receive one frame.
    pub async fn recv(&mut self) -> Result<Vec<u8>, wire::WireError> {
        wire::read_frame(&mut self.stream).await
    }

    /// Send one frame and wait up to `deadline` for a single reply.
    pub async fn roundtrip(
        &mut self,
        frame: &[u8],
        deadline: Duration,
    ) -> Result<Vec<u8>, wire::WireError> {
        self.send(frame).await?;
        match tokio::time::timeout(deadline, self.recv()).await {
            Ok(result) => result,
            Err(_) => Err(wire::WireError::Io(std::io::Error::from(
                std::io::ErrorKind::TimedOut,
            ))),
        }
    }
}
