// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pid-file based single-instance enforcement.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;
use tracing::{debug, warn};

/// Pid-file errors
#[derive(Debug, Error)]
pub enum PidFileError {
    #[error("Pid file {0} is held by another process")]
    AlreadyHeld(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An exclusively locked pid file.
///
/// The file is opened without truncation so a losing contender never wipes
/// the holder's recorded pid; our pid is written only once the lock is
/// held. The lock lives as long as the open file handle, so a crashed
/// holder releases it implicitly.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    file: Option<File>,
}

impl PidFile {
    /// Acquire the lock at `path` and record the current pid in it.
    pub fn acquire(path: &Path) -> Result<Self, PidFileError> {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        file.try_lock_exclusive().map_err(|e| {
            if e.kind() == fs2::lock_contended_error().kind() {
                PidFileError::AlreadyHeld(path.to_owned())
            } else {
                PidFileError::Io(e)
            }
        })?;

        // Truncate now that the lock is ours, then record our pid.
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.sync_all()?;

        debug!(path = %path.display(), "pid file acquired");
        Ok(Self { path: path.to_owned(), file: Some(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop the lock and remove the file. Safe to call more than once.
    pub fn release(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        // Closing the handle releases the advisory lock.
        drop(file);
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), "failed to remove pid file: {e}");
            }
        } else {
            debug!(path = %self.path.display(), "pid file released");
        }
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[path = "pidfile_tests.rs"]
mod tests;
