//! Husk PTY - pseudoterminal management
//!
//! Opens a master/slave pair, manages the kernel window size, and attaches
//! child processes to the slave with a proper session and controlling TTY.
//!
//! Reference: https://man7.org/linux/man-pages/man7/pty.7.html

mod error;
mod pty;
mod spawn;

pub use error::{Error, Result};
pub use pty::{Pty, WindowSize};
pub use spawn::attach_command;
