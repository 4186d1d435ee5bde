// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One bound listening socket and its accept loop.
//!
//! The listener owns every session it accepts. Teardown collapses the tree
//! leaf-first: stop accepting, destroy live sessions, close the listening
//! socket, unlink the path. The socket path exists on disk exactly as long
//! as the listener is alive.

use std::os::unix::ffi::OsStrExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nix::errno::Errno;
use parking_lot::Mutex;
use tokio::net::{UnixListener, UnixSocket, UnixStream};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::daemon::Event;
use crate::error::DaemonError;
use crate::hooks::{SocketHooks, Verdict};
use crate::session::{self, Session};

/// `sockaddr_un.sun_path` capacity minus the NUL terminator.
#[cfg(target_os = "linux")]
const MAX_PATH_LEN: usize = 107;
#[cfg(not(target_os = "linux"))]
const MAX_PATH_LEN: usize = 103;

/// Listen backlog for daemon sockets.
const BACKLOG: u32 = 10;

pub(crate) struct Listener {
    path: PathBuf,
    hooks: Arc<dyn SocketHooks>,
    socket: Option<Arc<UnixListener>>,
    sessions: Arc<Mutex<JoinSet<()>>>,
    cancel: CancellationToken,
    accept_task: Option<JoinHandle<()>>,
    torn_down: bool,
}

impl Listener {
    /// Create the socket, bind and listen. On return the path exists on
    /// disk; on error nothing is left behind.
    pub fn bind(
        path: &Path,
        hooks: Arc<dyn SocketHooks>,
        remove_before_bind: bool,
    ) -> Result<Self, DaemonError> {
        let len = path.as_os_str().as_bytes().len();
        if len == 0 || len > MAX_PATH_LEN {
            return Err(DaemonError::Config(format!(
                "socket path must be 1..={MAX_PATH_LEN} bytes, got {len}: {}",
                path.display()
            )));
        }

        if remove_before_bind {
            // The caller's pid-file proves no other instance owns this path.
            let _ = std::fs::remove_file(path);
        }

        let socket = UnixSocket::new_stream()?;
        socket
            .bind(path)
            .map_err(|source| DaemonError::Bind { path: path.to_owned(), source })?;
        let listener = socket.listen(BACKLOG).map_err(|source| {
            // Bind created the inode; do not leave it behind.
            let _ = std::fs::remove_file(path);
            DaemonError::Listen { path: path.to_owned(), source }
        })?;

        Ok(Self {
            path: path.to_owned(),
            hooks,
            socket: Some(Arc::new(listener)),
            sessions: Arc::new(Mutex::new(JoinSet::new())),
            cancel: CancellationToken::new(),
            accept_task: None,
            torn_down: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Spawn the accept loop. Fatal accept errors are reported on `events`.
    pub fn start(&mut self, events: mpsc::Sender<Event>) {
        let Some(socket) = self.socket.clone() else {
            return;
        };
        self.accept_task = Some(tokio::spawn(accept_loop(
            socket,
            self.path.clone(),
            Arc::clone(&self.hooks),
            Arc::clone(&self.sessions),
            self.cancel.clone(),
            events,
        )));
    }

    /// Stop accepting, destroy all live sessions, close the listening
    /// socket and unlink the path. Idempotent.
    pub async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.cancel.cancel();
        if let Some(task) = self.accept_task.take() {
            let _ = task.await;
        }

        // Aborted sessions never observe their in-flight read results.
        let mut sessions = std::mem::take(&mut *self.sessions.lock());
        sessions.shutdown().await;

        // Last reference: closes the listening fd.
        self.socket = None;
        unlink_socket(&self.path);
        debug!(path = %self.path.display(), "listener closed");
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        // Normal shutdown runs teardown() first; this covers a daemon that
        // was set up but never run.
        if !self.torn_down {
            self.cancel.cancel();
            self.sessions.lock().abort_all();
            self.socket = None;
            unlink_socket(&self.path);
        }
    }
}

fn unlink_socket(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), "failed to remove socket file: {e}");
        }
    }
}

async fn accept_loop(
    socket: Arc<UnixListener>,
    path: PathBuf,
    hooks: Arc<dyn SocketHooks>,
    sessions: Arc<Mutex<JoinSet<()>>>,
    cancel: CancellationToken,
    events: mpsc::Sender<Event>,
) {
    loop {
        // Reap sessions that finished on their own.
        {
            let mut sessions = sessions.lock();
            while sessions.try_join_next().is_some() {}
        }

        let accepted = tokio::select! {
            _ = cancel.cancelled() => return,
            res = socket.accept() => res,
        };

        match accepted {
            Ok((stream, _addr)) => accept_client(stream, &path, &hooks, &sessions),
            Err(e) if is_fatal_accept(&e) => {
                error!(path = %path.display(), "accept failed fatally: {e}");
                let _ = events.send(Event::ListenerFailed { path, source: e }).await;
                return;
            }
            Err(e) => {
                // Transient (ECONNABORTED, EMFILE, ...): keep accepting.
                warn!(path = %path.display(), "accept error: {e}");
            }
        }
    }
}

fn accept_client(
    stream: UnixStream,
    path: &Path,
    hooks: &Arc<dyn SocketHooks>,
    sessions: &Mutex<JoinSet<()>>,
) {
    let (session, reader) = Session::new(stream);

    let verdict = std::panic::catch_unwind(AssertUnwindSafe(|| hooks.connect(&session)))
        .unwrap_or_else(|_| {
            warn!(session = %session.id(), "connect hook panicked; rejecting client");
            Verdict::Reject
        });

    match verdict {
        Verdict::Accept => {
            debug!(path = %path.display(), session = %session.id(), "client connected");
            sessions.lock().spawn(session::serve(session, reader, Arc::clone(hooks)));
        }
        Verdict::Reject => {
            // Dropping both halves closes the fd; the client sees EOF.
            debug!(path = %path.display(), session = %session.id(), "client rejected");
        }
    }
}

/// Whether an accept error means the listening socket itself is dead.
fn is_fatal_accept(e: &std::io::Error) -> bool {
    matches!(
        e.raw_os_error().map(Errno::from_raw),
        Some(Errno::EBADF | Errno::EINVAL | Errno::ENOTSOCK)
    )
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
