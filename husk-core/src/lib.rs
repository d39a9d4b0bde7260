//! Husk Core - screen model for a headless terminal emulator
//!
//! This crate provides the state that backs a terminal screen:
//! - Colors and rendition attributes ([`Color`], [`StyledColor`])
//! - The grid: a dense W×H array of cells with cursor, pen, scroll
//!   margins and autowrap ([`Grid`])
//! - Geometry helpers ([`Pos`], [`Region`])
//!
//! The crate is deterministic: given the same sequence of operations it
//! always produces the same screen state. It performs no I/O.

mod color;
mod grid;
mod region;

pub use color::{ansi_escape, AttrFlags, Color, StyledColor};
pub use grid::Grid;
pub use region::{ChangeReason, Pos, Region};
