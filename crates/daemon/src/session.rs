// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-connection session state and serve loop.
//!
//! A session is one accepted client connection: the read half is driven by
//! the serve loop below, the write half is shared through the [`Session`]
//! handle that hooks receive. The loop keeps exactly one `read` hook in
//! flight per connection; frames are never pipelined.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use hearth_wire as wire;
use thiserror::Error;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::hooks::SocketHooks;

/// Identifier for one accepted connection, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Session-scoped errors. These destroy at most the one session and never
/// reach the daemon's run result.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session closed")]
    Closed,

    #[error(transparent)]
    Wire(#[from] wire::WireError),
}

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

struct SessionInner {
    id: SessionId,
    // Option so close() can drop the half early; later writes see Closed.
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    cancel: CancellationToken,
}

/// Handle to one live connection, passed to every socket hook.
///
/// Cheap to clone; hooks may stash a clone to write from elsewhere. Once
/// the session is destroyed, writes on surviving clones fail with
/// [`SessionError::Closed`].
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub(crate) fn new(stream: UnixStream) -> (Self, OwnedReadHalf) {
        let (reader, writer) = stream.into_split();
        let session = Self {
            inner: Arc::new(SessionInner {
                id: SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)),
                writer: tokio::sync::Mutex::new(Some(writer)),
                cancel: CancellationToken::new(),
            }),
        };
        (session, reader)
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    /// Queue one outbound frame on this connection.
    ///
    /// Completion of the underlying write is reported as the result of the
    /// returned future. A failed write poisons the session: the serve loop
    /// tears it down as an I/O failure.
    pub async fn write(&self, frame: &[u8]) -> Result<(), SessionError> {
        let mut guard = self.inner.writer.lock().await;
        let writer = guard.as_mut().ok_or(SessionError::Closed)?;
        match wire::write_frame(writer, frame).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.inner.cancel.cancel();
                Err(SessionError::Wire(e))
            }
        }
    }

    /// Drop the write half. Idempotent; clones see `Closed` afterwards.
    async fn close(&self) {
        self.inner.writer.lock().await.take();
    }
}

/// Serve one session until the peer goes away, an I/O operation fails, or
/// the read hook gives up.
///
/// The `connect` hook has already accepted by the time this runs. The
/// `disconnect` hook fires on every exit path here; sessions discarded by
/// listener teardown are aborted instead and never reach it.
pub(crate) async fn serve(
    session: Session,
    mut reader: OwnedReadHalf,
    hooks: Arc<dyn SocketHooks>,
) {
    let id = session.id();

    loop {
        let frame = tokio::select! {
            // A failed write from user code poisons the session.
            _ = session.inner.cancel.cancelled() => {
                debug!(session = %id, "session write failed");
                break;
            }
            res = wire::read_frame(&mut reader) => res,
        };

        match frame {
            Ok(frame) => {
                match AssertUnwindSafe(hooks.read(&session, frame)).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        debug!(session = %id, "read hook failed: {e}");
                        break;
                    }
                    Err(_) => {
                        warn!(session = %id, "read hook panicked");
                        break;
                    }
                }
            }
            Err(e) if e.is_disconnect() => {
                debug!(session = %id, "client disconnected");
                break;
            }
            Err(e) => {
                warn!(session = %id, "session read error: {e}");
                break;
            }
        }
    }

    if std::panic::catch_unwind(AssertUnwindSafe(|| hooks.disconnect(&session))).is_err() {
        warn!(session = %id, "disconnect hook panicked");
    }
    session.close().await;
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
