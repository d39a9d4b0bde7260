//! Input encoding: key names and mouse events to PTY bytes
//!
//! Keys arrive as the symbolic names hosts deal in (`"enter"`, `"f5"`,
//! `"ctrl+c"`) and map to xterm byte sequences. Mouse events are filtered
//! by the active mouse mode and encoded per the active encoding.

use crate::settings::{MouseEncoding, MouseMode};

/// Button number used for motion while a button is held (mode 1002).
const MOTION_BUTTON: i32 = 32;
/// Button number used for motion with no button held (mode 1003).
const MOTION_ALL_BUTTON: i32 = 35;
/// Largest coordinate the X10 encoding can carry.
const X10_MAX_COORD: u16 = 222;

/// Encode a symbolic key name as the bytes the child expects.
/// Unknown multi-character names encode to nothing.
pub fn encode_key(key: &str) -> Vec<u8> {
    let bytes: &[u8] = match key {
        "enter" => b"\r",
        "tab" => b"\t",
        "backspace" => b"\x08",
        "delete" => b"\x7f",
        "esc" => b"\x1b",
        "up" => b"\x1b[A",
        "down" => b"\x1b[B",
        "right" => b"\x1b[C",
        "left" => b"\x1b[D",
        "home" => b"\x1b[H",
        "end" => b"\x1b[F",
        "pgup" => b"\x1b[5~",
        "pgdn" => b"\x1b[6~",
        "insert" => b"\x1b[2~",
        "f1" => b"\x1bOP",
        "f2" => b"\x1bOQ",
        "f3" => b"\x1bOR",
        "f4" => b"\x1bOS",
        "f5" => b"\x1b[15~",
        "f6" => b"\x1b[17~",
        "f7" => b"\x1b[18~",
        "f8" => b"\x1b[19~",
        "f9" => b"\x1b[20~",
        "f10" => b"\x1b[21~",
        "f11" => b"\x1b[23~",
        "f12" => b"\x1b[24~",
        "ctrl+c" => b"\x03",
        "ctrl+d" => b"\x04",
        "ctrl+z" => b"\x1a",
        "ctrl+l" => b"\x0c",
        _ => {
            return if key.chars().count() == 1 {
                key.as_bytes().to_vec()
            } else {
                Vec::new()
            };
        }
    };
    bytes.to_vec()
}

/// Encode a mouse event, or `None` when the active mode filters it out.
/// `button` is the wire button number; `-1` marks motion without a press.
pub fn encode_mouse(
    button: i32,
    x: u16,
    y: u16,
    pressed: bool,
    mode: MouseMode,
    encoding: MouseEncoding,
) -> Option<Vec<u8>> {
    let is_motion = button == -1;
    let mut button = button;

    match mode {
        MouseMode::None => return None,
        MouseMode::Press => {
            if !pressed || is_motion {
                return None;
            }
        }
        MouseMode::PressRelease => {
            if is_motion {
                return None;
            }
        }
        MouseMode::PressReleaseMotion => {
            if is_motion {
                button = MOTION_BUTTON;
            }
        }
        MouseMode::PressReleaseMotionAll => {
            if is_motion {
                button = MOTION_ALL_BUTTON;
            }
        }
    }

    let release = !pressed && !is_motion;
    let seq = match encoding {
        MouseEncoding::Sgr => {
            let action = if release { 'm' } else { 'M' };
            format!(
                "\x1b[<{};{};{}{}",
                button,
                u32::from(x) + 1,
                u32::from(y) + 1,
                action
            )
        }
        MouseEncoding::Utf8 => {
            let code = 32 + button + if release { 3 } else { 0 };
            let mut seq = String::from("\x1b[M");
            push_coord(&mut seq, code as u32);
            push_coord(&mut seq, u32::from(x) + 33);
            push_coord(&mut seq, u32::from(y) + 33);
            seq
        }
        MouseEncoding::X10 => {
            if x > X10_MAX_COORD || y > X10_MAX_COORD {
                return None;
            }
            let mut seq = String::from("\x1b[M");
            push_coord(&mut seq, (32 + button) as u32);
            push_coord(&mut seq, u32::from(x) + 33);
            push_coord(&mut seq, u32::from(y) + 33);
            seq
        }
    };
    Some(seq.into_bytes())
}

fn push_coord(seq: &mut String, value: u32) {
    seq.push(char::from_u32(value).unwrap_or(' '));
}
