//! Emulator error types

use std::io;
use thiserror::Error;

/// Errors surfaced by emulator operations
#[derive(Error, Debug)]
pub enum Error {
    /// An I/O operation was attempted after `close` or before the PTY
    /// existed
    #[error("PTY not initialized")]
    PtyNotInitialized,

    /// Dimensions must be positive
    #[error("invalid terminal size {cols}x{rows}")]
    InvalidSize { cols: usize, rows: usize },

    /// The child process could not be started
    #[error("failed to start child: {0}")]
    ChildStart(String),

    /// The child exited with a non-zero status; delivered through the exit
    /// callback
    #[error("child exited with status {0}")]
    ChildExit(i32),

    /// PTY layer error
    #[error(transparent)]
    Pty(#[from] husk_pty::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, Error>;
