//! Error types for PTY operations

use std::io;
use thiserror::Error;

/// PTY error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// PTY creation failed
    #[error("failed to create PTY: {0}")]
    PtyCreation(String),

    /// Failed to set or query the window size
    #[error("window size ioctl failed: {0}")]
    WindowSize(String),

    /// Failed to spawn a child on the slave side
    #[error("failed to spawn child: {0}")]
    SpawnFailed(String),

    /// System call error
    #[error("system error: {0}")]
    Nix(#[from] nix::Error),
}

/// Result type for PTY operations
pub type Result<T> = std::result::Result<T, Error>;
