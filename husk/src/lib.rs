//! Husk - a headless terminal emulator
//!
//! Husk runs a child process on a pseudoterminal, interprets its output as
//! an `xterm-256color` control stream, and keeps the resulting screen in
//! memory. Hosts poll [`Emulator::snapshot`] for ANSI-styled rows and push
//! keystrokes, mouse events and resizes back through the emulator, which
//! encodes them the way the child expects.
//!
//! ```no_run
//! use std::process::Command;
//!
//! let emu = husk::Emulator::new(80, 24)?;
//! emu.start_command(Command::new("htop"))?;
//! emu.send_key("down")?;
//! let frame = emu.snapshot();
//! for row in &frame.rows {
//!     println!("{row}");
//! }
//! emu.close();
//! # Ok::<(), husk::Error>(())
//! ```

mod emulator;
mod error;
pub mod input;
mod settings;
mod term;

pub use emulator::{EmittedFrame, Emulator, ExitEvent};
pub use error::{Error, Result};
pub use settings::{MouseEncoding, MouseMode, Settings, ViewFlag, ViewString};
pub use term::Terminal;

pub use husk_core::{AttrFlags, Color, Grid, Pos, Region, StyledColor};
