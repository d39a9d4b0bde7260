//! Terminal state: both screens, settings, and the control-stream performer
//!
//! [`Terminal`] owns the main and alternate grids plus the settings surface,
//! and applies parsed actions to them. It is synchronization-free; the
//! [`Emulator`](crate::Emulator) serializes access from the PTY reader and
//! host threads.

use husk_core::{AttrFlags, ChangeReason, Color, Grid, Region, StyledColor};
use husk_parser::{Action, CsiAction, EscAction, OscAction, Parser};

use crate::settings::{MouseEncoding, MouseMode, Settings, ViewFlag, ViewString};

/// Longest window title we keep.
const MAX_TITLE_LEN: usize = 4096;

/// Reply to a primary Device Attributes query: VT100 with AVO.
const DA1_REPLY: &[u8] = b"\x1b[?1;2c";
/// Reply to a secondary Device Attributes query.
const DA2_REPLY: &[u8] = b"\x1b[>1;4402;0c";

/// Complete terminal state plus the parser that feeds it
pub struct Terminal {
    main: Grid,
    alt: Grid,
    on_alt: bool,
    settings: Settings,
    parser: Parser,
    responses: Vec<Vec<u8>>,
}

impl Terminal {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            main: Grid::new(cols, rows),
            alt: Grid::new(cols, rows),
            on_alt: false,
            settings: Settings::new(),
            parser: Parser::new(),
            responses: Vec::new(),
        }
    }

    /// The currently visible grid.
    pub fn grid(&self) -> &Grid {
        if self.on_alt {
            &self.alt
        } else {
            &self.main
        }
    }

    fn grid_mut(&mut self) -> &mut Grid {
        if self.on_alt {
            &mut self.alt
        } else {
            &mut self.main
        }
    }

    pub fn main_grid(&self) -> &Grid {
        &self.main
    }

    pub fn alt_grid(&self) -> &Grid {
        &self.alt
    }

    pub fn on_alt(&self) -> bool {
        self.on_alt
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Flip between the main and alternate screen. Neither grid is cleared;
    /// applications that expect a blank alternate screen erase it themselves.
    pub fn switch_screen(&mut self) {
        self.on_alt = !self.on_alt;
        log::trace!("screen switch ({:?})", ChangeReason::ScreenSwitch);
    }

    /// Resize both grids. The PTY winsize is the emulator's concern.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.main.set_size(cols, rows);
        self.alt.set_size(cols, rows);
    }

    /// Feed raw bytes from the PTY through the parser into the screen.
    pub fn process(&mut self, data: &[u8]) {
        let mut actions = Vec::new();
        self.parser.parse(data, |action| actions.push(action));
        for action in actions {
            self.apply(action);
        }
    }

    /// Pending replies (device attribute reports) to write back to the PTY.
    pub fn take_responses(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.responses)
    }

    fn queue_response(&mut self, response: Vec<u8>) {
        self.responses.push(response);
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Print(run) => {
                let runes: Vec<char> = run.chars().collect();
                self.grid_mut().write_runes(&runes);
            }
            Action::Control(byte) => self.handle_control(byte),
            Action::Esc(esc) => self.handle_esc(esc),
            Action::Csi(csi) => self.handle_csi(csi),
            Action::Osc(osc) => self.handle_osc(osc),
        }
    }

    fn handle_control(&mut self, byte: u8) {
        match byte {
            0x00 => {}
            0x07 => {
                log::trace!("bell");
            }
            0x08 => self.grid_mut().move_cursor(-1, 0, false, false),
            0x09 => self.tab(),
            0x0a => self.grid_mut().move_cursor(0, 1, true, true),
            0x0c => self.grid_mut().move_cursor(0, 1, false, true),
            0x0d => {
                let dx = self.grid().cursor().x as isize;
                self.grid_mut().move_cursor(-dx, 0, true, true);
            }
            0x7f => {
                let cursor = self.grid().cursor();
                self.grid_mut()
                    .erase(Region::cell(cursor.x, cursor.y), ChangeReason::Clear);
            }
            _ => {}
        }
    }

    /// Move to the next 8-column tab stop, clamped to the last column.
    fn tab(&mut self) {
        let cursor = self.grid().cursor();
        let next = (cursor.x / 8 + 1) * 8;
        self.grid_mut().set_cursor_pos(next, cursor.y);
    }

    fn handle_esc(&mut self, esc: EscAction) {
        match esc {
            EscAction::Index => self.grid_mut().move_cursor(0, 1, false, true),
            EscAction::ReverseIndex => self.grid_mut().move_cursor(0, -1, false, true),
            EscAction::Reset => {
                log::debug!("full reset requested; not implemented");
            }
            EscAction::ApplicationKeypad | EscAction::NormalKeypad => {}
            EscAction::SelectCharset(slot, designator) => {
                log::trace!("charset designation ignored: {} {designator}", slot as char);
            }
        }
    }

    fn handle_csi(&mut self, csi: CsiAction) {
        match csi.marker {
            b'>' => return self.handle_csi_gt(&csi),
            b'?' => return self.handle_csi_private(&csi),
            _ => {}
        }

        let n = csi.param(0, 1) as usize;
        match csi.final_byte {
            b'A' => self.grid_mut().move_cursor(0, -(n as isize), false, true),
            b'B' => self.grid_mut().move_cursor(0, n as isize, false, true),
            b'C' => self.grid_mut().move_cursor(n as isize, 0, false, false),
            b'D' => self.grid_mut().move_cursor(-(n as isize), 0, false, false),
            b'G' => {
                let y = self.grid().cursor().y;
                self.grid_mut().set_cursor_pos(n - 1, y);
            }
            b'd' => {
                let x = self.grid().cursor().x;
                self.grid_mut().set_cursor_pos(x, n - 1);
            }
            b'H' | b'f' => {
                let row = csi.param(0, 1) as usize;
                let col = csi.param(1, 1) as usize;
                self.grid_mut().set_cursor_pos(col - 1, row - 1);
            }
            b'J' => self.erase_in_display(csi.params.raw(0)),
            b'K' => self.erase_in_line(csi.params.raw(0)),
            b'L' => {
                let cursor_y = self.grid().cursor().y;
                let bottom = self.grid().bottom_margin();
                self.grid_mut().scroll(cursor_y, bottom, n as isize);
            }
            b'M' => {
                let cursor_y = self.grid().cursor().y;
                let bottom = self.grid().bottom_margin();
                self.grid_mut().scroll(cursor_y, bottom, -(n as isize));
            }
            b'S' => {
                let top = self.grid().top_margin();
                let bottom = self.grid().bottom_margin();
                self.grid_mut().scroll(top, bottom, -(n as isize));
            }
            b'T' => {
                let top = self.grid().top_margin();
                let bottom = self.grid().bottom_margin();
                self.grid_mut().scroll(top, bottom, n as isize);
            }
            b'P' | b'X' => {
                let cursor = self.grid().cursor();
                self.grid_mut().erase(
                    Region::new(cursor.x, cursor.y, cursor.x + n, cursor.y + 1),
                    ChangeReason::Clear,
                );
            }
            b'r' => {
                let top = csi.param(0, 1) as usize;
                let bottom = csi.param(1, self.grid().height() as u16) as usize;
                self.grid_mut()
                    .set_margins(top.saturating_sub(1), bottom.saturating_sub(1));
            }
            b'c' => {
                if csi.params.raw(0) == 0 {
                    self.queue_response(DA1_REPLY.to_vec());
                }
            }
            b'h' | b'l' => {
                for param in csi.params.iter() {
                    match param {
                        // Insert mode: accepted, not implemented.
                        4 => log::trace!("ANSI insert mode ignored"),
                        other => log::debug!("unhandled ANSI mode {other}"),
                    }
                }
            }
            b'm' => self.handle_sgr(&csi),
            b'n' => {
                log::debug!("DSR {} ignored", csi.params.raw(0));
            }
            other => {
                log::debug!(
                    "unknown CSI final {:?} params {:?}",
                    other as char,
                    csi.params
                );
            }
        }
    }

    fn handle_csi_gt(&mut self, csi: &CsiAction) {
        match csi.final_byte {
            b'c' => self.queue_response(DA2_REPLY.to_vec()),
            other => log::debug!("unknown CSI > final {:?}", other as char),
        }
    }

    fn handle_csi_private(&mut self, csi: &CsiAction) {
        match csi.final_byte {
            b'h' | b'l' => {
                let value = csi.final_byte == b'h';
                for param in csi.params.iter() {
                    self.set_dec_mode(param, value);
                }
            }
            other => log::debug!("unknown CSI ? final {:?}", other as char),
        }
    }

    fn set_dec_mode(&mut self, mode: u16, value: bool) {
        match mode {
            1 => self.settings.cursor_keys_application = value,
            7 => self.grid_mut().set_auto_wrap(value),
            9 => self.settings.set_mouse_mode(if value {
                MouseMode::Press
            } else {
                MouseMode::None
            }),
            12 => self.settings.set_flag(ViewFlag::BlinkCursor, value),
            25 => self.settings.set_flag(ViewFlag::ShowCursor, value),
            1000 => self.settings.set_mouse_mode(if value {
                MouseMode::PressRelease
            } else {
                MouseMode::None
            }),
            1002 => self.settings.set_mouse_mode(if value {
                MouseMode::PressReleaseMotion
            } else {
                MouseMode::None
            }),
            1003 => self.settings.set_mouse_mode(if value {
                MouseMode::PressReleaseMotionAll
            } else {
                MouseMode::None
            }),
            1004 => self.settings.set_flag(ViewFlag::ReportFocus, value),
            1005 => self.settings.set_mouse_encoding(if value {
                MouseEncoding::Utf8
            } else {
                MouseEncoding::X10
            }),
            1006 => self.settings.set_mouse_encoding(if value {
                MouseEncoding::Sgr
            } else {
                MouseEncoding::X10
            }),
            1049 => self.switch_screen(),
            2004 => self.settings.set_flag(ViewFlag::BracketedPaste, value),
            other => log::debug!("unhandled DEC mode {other} = {value}"),
        }
    }

    fn erase_in_display(&mut self, mode: u16) {
        let cursor = self.grid().cursor();
        let (w, h) = (self.grid().width(), self.grid().height());
        match mode {
            0 => self
                .grid_mut()
                .erase(Region::new(0, cursor.y, w, h), ChangeReason::Clear),
            1 => self
                .grid_mut()
                .erase(Region::new(0, 0, w, cursor.y), ChangeReason::Clear),
            2 => {
                self.grid_mut()
                    .erase(Region::new(0, 0, w, h), ChangeReason::Clear);
                self.grid_mut().set_cursor_pos(0, 0);
            }
            other => log::debug!("unknown ED mode {other}"),
        }
    }

    fn erase_in_line(&mut self, mode: u16) {
        let cursor = self.grid().cursor();
        let w = self.grid().width();
        match mode {
            0 => self.grid_mut().erase(
                Region::new(cursor.x, cursor.y, w, cursor.y + 1),
                ChangeReason::Clear,
            ),
            1 => self.grid_mut().erase(
                Region::new(0, cursor.y, cursor.x, cursor.y + 1),
                ChangeReason::Clear,
            ),
            2 => self.grid_mut().erase(
                Region::new(0, cursor.y, w, cursor.y + 1),
                ChangeReason::Clear,
            ),
            other => log::debug!("unknown EL mode {other}"),
        }
    }

    fn handle_sgr(&mut self, csi: &CsiAction) {
        let (mut fg, mut bg) = self.grid().pen();
        let params = csi.params.as_slice();
        let params: &[u16] = if params.is_empty() { &[0] } else { params };

        let mut i = 0;
        while i < params.len() {
            let p = params[i];
            match p {
                0 => {
                    fg = StyledColor::new(Color::WHITE);
                    bg = StyledColor::new(Color::BLACK);
                }
                1..=9 => {
                    if let Some(mode) = AttrFlags::from_sgr(p) {
                        fg = fg.set_mode(mode);
                    }
                }
                22 => fg = fg.reset_mode(AttrFlags::BOLD | AttrFlags::DIM),
                23 => fg = fg.reset_mode(AttrFlags::ITALIC),
                24 => fg = fg.reset_mode(AttrFlags::UNDERLINE),
                27 => fg = fg.reset_mode(AttrFlags::REVERSE),
                30..=37 => fg = fg.with_color(Color::Named((p - 30) as u8)),
                39 => fg = fg.with_color(Color::WHITE),
                40..=47 => bg = bg.with_color(Color::Named((p - 40) as u8)),
                49 => bg = bg.with_color(Color::BLACK),
                38 | 48 => {
                    if i + 2 < params.len() && params[i + 1] == 5 {
                        let color = Color::indexed((params[i + 2] & 0xff) as u8);
                        if p == 38 {
                            fg = fg.with_color(color);
                        } else {
                            bg = bg.with_color(color);
                        }
                        i += 2;
                    } else if i + 4 < params.len() && params[i + 1] == 2 {
                        let color = Color::rgb(
                            params[i + 2] as u8,
                            params[i + 3] as u8,
                            params[i + 4] as u8,
                        );
                        if p == 38 {
                            fg = fg.with_color(color);
                        } else {
                            bg = bg.with_color(color);
                        }
                        i += 4;
                    }
                }
                90..=97 => fg = fg.with_color(Color::Named((p - 90 + 8) as u8)),
                100..=107 => bg = bg.with_color(Color::Named((p - 100 + 8) as u8)),
                other => {
                    log::debug!("unknown SGR parameter {other}; dropping rest");
                    break;
                }
            }
            self.grid_mut().set_pen(fg, bg);
            i += 1;
        }
    }

    fn handle_osc(&mut self, osc: OscAction) {
        match osc.code {
            0 | 2 => {
                let title: String = osc.payload.chars().take(MAX_TITLE_LEN).collect();
                self.settings.set_string(ViewString::WindowTitle, title);
            }
            6 => self
                .settings
                .set_string(ViewString::CurrentDirectory, osc.payload),
            7 => self
                .settings
                .set_string(ViewString::CurrentFile, osc.payload),
            4 | 104 | 112 => {
                log::trace!("palette OSC {} ignored", osc.code);
            }
            other => log::debug!("unknown OSC {other}"),
        }
    }
}


#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any byte stream leaves the cursor inside the grid and both
        /// margins ordered.
        #[test]
        fn bounds_hold_for_arbitrary_streams(
            data in prop::collection::vec(any::<u8>(), 0..2048)
        ) {
            let mut t = Terminal::new(13, 7);
            t.process(&data);
            let grid = t.grid();
            prop_assert!(grid.cursor().x < grid.width());
            prop_assert!(grid.cursor().y < grid.height());
            prop_assert!(grid.top_margin() <= grid.bottom_margin());
            prop_assert!(grid.bottom_margin() < grid.height());
        }
    }
}
