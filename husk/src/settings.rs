//! Terminal settings written by the parser and queried by hosts
//!
//! Three small surfaces: boolean view flags, the mouse mode/encoding pair,
//! and string values. All of it lives under the emulator lock alongside the
//! grids.

use serde::{Deserialize, Serialize};

/// Boolean flags a host may want to render differently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewFlag {
    BlinkCursor,
    ShowCursor,
    ReportFocus,
    BracketedPaste,
}

const VIEW_FLAG_COUNT: usize = 4;

/// String values reported by the child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewString {
    WindowTitle,
    CurrentDirectory,
    CurrentFile,
}

const VIEW_STRING_COUNT: usize = 3;

/// Which mouse events the child has asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseMode {
    #[default]
    None,
    Press,
    PressRelease,
    PressReleaseMotion,
    PressReleaseMotionAll,
}

/// How mouse events are encoded on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseEncoding {
    #[default]
    X10,
    Utf8,
    Sgr,
}

/// The full settings surface
#[derive(Debug, Clone, Default)]
pub struct Settings {
    flags: [bool; VIEW_FLAG_COUNT],
    strings: [String; VIEW_STRING_COUNT],
    mouse_mode: MouseMode,
    mouse_encoding: MouseEncoding,
    /// DECCKM, stored but not wired into key encoding
    pub cursor_keys_application: bool,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&self, flag: ViewFlag) -> bool {
        self.flags[flag as usize]
    }

    pub fn set_flag(&mut self, flag: ViewFlag, value: bool) {
        self.flags[flag as usize] = value;
    }

    pub fn string(&self, string: ViewString) -> &str {
        &self.strings[string as usize]
    }

    pub fn set_string(&mut self, string: ViewString, value: String) {
        self.strings[string as usize] = value;
    }

    pub fn mouse_mode(&self) -> MouseMode {
        self.mouse_mode
    }

    pub fn set_mouse_mode(&mut self, mode: MouseMode) {
        self.mouse_mode = mode;
    }

    pub fn mouse_encoding(&self) -> MouseEncoding {
        self.mouse_encoding
    }

    pub fn set_mouse_encoding(&mut self, encoding: MouseEncoding) {
        self.mouse_encoding = encoding;
    }
}
