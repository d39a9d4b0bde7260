//! Color and rendition attributes for terminal cells
//!
//! Supports:
//! - Default foreground/background
//! - 16 named ANSI colors (0-15)
//! - 256-color palette (16-255)
//! - 24-bit true color (RGB)
//!
//! A [`StyledColor`] pairs a color value with the SGR attribute bitmask so
//! that a cell's full rendition travels as one copyable value.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Color value supporting all terminal color modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    /// Default terminal color (foreground or background)
    Default,
    /// Named ANSI color (0-7 standard, 8-15 bright)
    Named(u8),
    /// 256-color palette entry (16-231 color cube, 232-255 grayscale)
    Indexed(u8),
    /// 24-bit RGB color
    Rgb { r: u8, g: u8, b: u8 },
}

impl Color {
    pub const BLACK: Color = Color::Named(0);
    pub const RED: Color = Color::Named(1);
    pub const GREEN: Color = Color::Named(2);
    pub const YELLOW: Color = Color::Named(3);
    pub const BLUE: Color = Color::Named(4);
    pub const MAGENTA: Color = Color::Named(5);
    pub const CYAN: Color = Color::Named(6);
    pub const WHITE: Color = Color::Named(7);

    /// Palette entry by index; indices below 16 collapse to the named range.
    pub fn indexed(index: u8) -> Self {
        if index < 16 {
            Color::Named(index)
        } else {
            Color::Indexed(index)
        }
    }

    /// True-color value.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Rgb { r, g, b }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::Default
    }
}

bitflags! {
    /// SGR rendition attributes. Bit `n` corresponds to SGR parameter `n + 1`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct AttrFlags: u16 {
        const BOLD = 1 << 0;
        const DIM = 1 << 1;
        const ITALIC = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK = 1 << 4;
        const BLINK2 = 1 << 5;
        const REVERSE = 1 << 6;
        const HIDDEN = 1 << 7;
        const STRIKE = 1 << 8;
    }
}

impl AttrFlags {
    /// Attribute flag for an SGR parameter in `1..=9`, if any.
    pub fn from_sgr(param: u16) -> Option<AttrFlags> {
        match param {
            1..=9 => AttrFlags::from_bits(1 << (param - 1)),
            _ => None,
        }
    }
}

/// A color value plus the rendition attributes active alongside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StyledColor {
    color: Color,
    attrs: AttrFlags,
}

impl StyledColor {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            attrs: AttrFlags::empty(),
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn attrs(&self) -> AttrFlags {
        self.attrs
    }

    /// Replace the color value, preserving attributes.
    pub fn with_color(self, color: Color) -> Self {
        Self { color, ..self }
    }

    /// Set an attribute bit.
    pub fn set_mode(self, mode: AttrFlags) -> Self {
        Self {
            attrs: self.attrs | mode,
            ..self
        }
    }

    /// Clear an attribute bit.
    pub fn reset_mode(self, mode: AttrFlags) -> Self {
        Self {
            attrs: self.attrs - mode,
            ..self
        }
    }
}

impl From<Color> for StyledColor {
    fn from(color: Color) -> Self {
        StyledColor::new(color)
    }
}

/// Render the shortest `CSI … m` sequence that realizes `fg` and `bg`,
/// prefixed with a reset so prior terminal state cannot leak into the run.
pub fn ansi_escape(fg: StyledColor, bg: StyledColor) -> String {
    let mut params = String::from("0");

    for bit in 0..9u16 {
        if fg.attrs.contains(AttrFlags::from_bits_truncate(1 << bit)) {
            params.push_str(&format!(";{}", bit + 1));
        }
    }

    match fg.color {
        Color::Default => params.push_str(";39"),
        Color::Named(n) if n < 8 => params.push_str(&format!(";{}", 30 + n)),
        Color::Named(n) => params.push_str(&format!(";{}", 90 + (n - 8))),
        Color::Indexed(n) => params.push_str(&format!(";38;5;{n}")),
        Color::Rgb { r, g, b } => params.push_str(&format!(";38;2;{r};{g};{b}")),
    }

    match bg.color {
        Color::Default => params.push_str(";49"),
        Color::Named(n) if n < 8 => params.push_str(&format!(";{}", 40 + n)),
        Color::Named(n) => params.push_str(&format!(";{}", 100 + (n - 8))),
        Color::Indexed(n) => params.push_str(&format!(";48;5;{n}")),
        Color::Rgb { r, g, b } => params.push_str(&format!(";48;2;{r};{g};{b}")),
    }

    format!("\x1b[{params}m")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_collapses_to_named() {
        assert_eq!(Color::indexed(1), Color::Named(1));
        assert_eq!(Color::indexed(196), Color::Indexed(196));
    }

    #[test]
    fn test_with_color_preserves_attrs() {
        let c = StyledColor::new(Color::RED).set_mode(AttrFlags::BOLD);
        let c = c.with_color(Color::GREEN);
        assert_eq!(c.color(), Color::GREEN);
        assert!(c.attrs().contains(AttrFlags::BOLD));
    }

    #[test]
    fn test_set_reset_mode() {
        let c = StyledColor::new(Color::Default)
            .set_mode(AttrFlags::UNDERLINE)
            .set_mode(AttrFlags::REVERSE);
        assert!(c.attrs().contains(AttrFlags::UNDERLINE));
        let c = c.reset_mode(AttrFlags::UNDERLINE);
        assert!(!c.attrs().contains(AttrFlags::UNDERLINE));
        assert!(c.attrs().contains(AttrFlags::REVERSE));
    }

    #[test]
    fn test_sgr_param_mapping() {
        assert_eq!(AttrFlags::from_sgr(1), Some(AttrFlags::BOLD));
        assert_eq!(AttrFlags::from_sgr(7), Some(AttrFlags::REVERSE));
        assert_eq!(AttrFlags::from_sgr(9), Some(AttrFlags::STRIKE));
        assert_eq!(AttrFlags::from_sgr(10), None);
        assert_eq!(AttrFlags::from_sgr(0), None);
    }

    #[test]
    fn test_ansi_escape_named() {
        let fg = StyledColor::new(Color::RED);
        let bg = StyledColor::new(Color::BLACK);
        assert_eq!(ansi_escape(fg, bg), "\x1b[0;31;40m");
    }

    #[test]
    fn test_ansi_escape_bright_and_default() {
        let fg = StyledColor::new(Color::Named(9));
        let bg = StyledColor::new(Color::Default);
        assert_eq!(ansi_escape(fg, bg), "\x1b[0;91;49m");
    }

    #[test]
    fn test_ansi_escape_indexed_and_rgb() {
        let fg = StyledColor::new(Color::Indexed(196));
        let bg = StyledColor::new(Color::rgb(10, 20, 30));
        assert_eq!(ansi_escape(fg, bg), "\x1b[0;38;5;196;48;2;10;20;30m");
    }

    #[test]
    fn test_ansi_escape_attrs() {
        let fg = StyledColor::new(Color::WHITE)
            .set_mode(AttrFlags::BOLD)
            .set_mode(AttrFlags::UNDERLINE);
        let bg = StyledColor::new(Color::BLACK);
        assert_eq!(ansi_escape(fg, bg), "\x1b[0;1;4;37;40m");
    }
}
