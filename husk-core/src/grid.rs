//! The terminal grid: a dense W×H array of cells
//!
//! Three parallel planes (runes, foreground colors, background colors) are
//! stored as flat `W*H` arrays so that row rendering can walk spans of
//! identical styling without per-cell tag checks, and scrolling is a row
//! copy within each plane.
//!
//! The grid also owns the pieces of terminal state that are per-screen:
//! cursor position, current pen, scroll margins and the autowrap flag. The
//! alternate screen is simply a second `Grid`.

use crate::color::{ansi_escape, Color, StyledColor};
use crate::region::{ChangeReason, Pos, Region};

/// A fixed-size screen of cells with cursor, pen and scroll margins
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    runes: Vec<char>,
    fg: Vec<StyledColor>,
    bg: Vec<StyledColor>,
    width: usize,
    height: usize,

    cursor: Pos,
    pen_fg: StyledColor,
    pen_bg: StyledColor,

    top_margin: usize,
    bottom_margin: usize,

    auto_wrap: bool,
}

impl Grid {
    /// Create a grid filled with spaces in the default pen (white on black).
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero; callers validate sizes before
    /// they reach the grid.
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be positive");
        let pen_fg = StyledColor::new(Color::WHITE);
        let pen_bg = StyledColor::new(Color::BLACK);
        Self {
            runes: vec![' '; width * height],
            fg: vec![pen_fg; width * height],
            bg: vec![pen_bg; width * height],
            width,
            height,
            cursor: Pos::default(),
            pen_fg,
            pen_bg,
            top_margin: 0,
            bottom_margin: height - 1,
            auto_wrap: true,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cursor(&self) -> Pos {
        self.cursor
    }

    pub fn pen(&self) -> (StyledColor, StyledColor) {
        (self.pen_fg, self.pen_bg)
    }

    /// Set the pen applied to newly written and erased cells.
    pub fn set_pen(&mut self, fg: StyledColor, bg: StyledColor) {
        self.pen_fg = fg;
        self.pen_bg = bg;
    }

    pub fn auto_wrap(&self) -> bool {
        self.auto_wrap
    }

    pub fn set_auto_wrap(&mut self, on: bool) {
        self.auto_wrap = on;
    }

    pub fn top_margin(&self) -> usize {
        self.top_margin
    }

    pub fn bottom_margin(&self) -> usize {
        self.bottom_margin
    }

    /// The rune stored at `(x, y)`, or space when out of range.
    pub fn rune_at(&self, x: usize, y: usize) -> char {
        if x >= self.width || y >= self.height {
            return ' ';
        }
        self.runes[y * self.width + x]
    }

    /// The `(fg, bg)` pair at `(x, y)`, or the current pen when out of range.
    pub fn colors_at(&self, x: usize, y: usize) -> (StyledColor, StyledColor) {
        if x >= self.width || y >= self.height {
            return (self.pen_fg, self.pen_bg);
        }
        let i = y * self.width + x;
        (self.fg[i], self.bg[i])
    }

    /// Row `y` as plain text, without styling.
    pub fn row_text(&self, y: usize) -> String {
        if y >= self.height {
            return String::new();
        }
        self.runes[y * self.width..(y + 1) * self.width]
            .iter()
            .collect()
    }

    /// Set every cell in the clamped region to a space in the current pen.
    /// The cursor does not move. `reason` is advisory metadata only.
    pub fn erase(&mut self, region: Region, reason: ChangeReason) {
        let r = region.clamp(self.width, self.height);
        if r.is_empty() {
            return;
        }
        log::trace!("erase {r:?} ({reason:?})");
        for y in r.y..r.y2 {
            let start = y * self.width + r.x;
            let end = y * self.width + r.x2;
            self.runes[start..end].fill(' ');
            self.fg[start..end].fill(self.pen_fg);
            self.bg[start..end].fill(self.pen_bg);
        }
    }

    /// Write printable runes starting at the cursor, advancing it one column
    /// per rune. At the right edge the cursor wraps to the next row when
    /// autowrap is on (scrolling at the bottom margin); otherwise it stays
    /// pinned on the last column and further runes overwrite it.
    pub fn write_runes(&mut self, runes: &[char]) {
        let mut rest = runes;
        while !rest.is_empty() {
            let n = (self.width - self.cursor.x).min(rest.len());
            self.raw_write_runes(self.cursor.x, self.cursor.y, &rest[..n]);
            rest = &rest[n..];
            self.move_cursor(n as isize, 0, true, true);
        }
    }

    /// Copy runes into one row, painting the current pen under them.
    /// The slice must fit within the row.
    fn raw_write_runes(&mut self, x: usize, y: usize, runes: &[char]) {
        if y >= self.height || x + runes.len() > self.width {
            log::error!(
                "write out of range: ({x},{y}) len {} on {}x{} grid",
                runes.len(),
                self.width,
                self.height
            );
            return;
        }
        let start = y * self.width + x;
        let end = start + runes.len();
        self.runes[start..end].copy_from_slice(runes);
        self.fg[start..end].fill(self.pen_fg);
        self.bg[start..end].fill(self.pen_bg);
    }

    /// Relative cursor motion.
    ///
    /// With `wrap` and autowrap both set, horizontal motion carries across
    /// row boundaries; otherwise X is clamped. With `scroll`, vertical
    /// motion past a scroll margin scrolls the margin region and pins the
    /// cursor at the boundary; otherwise Y is clamped to the grid.
    pub fn move_cursor(&mut self, dx: isize, dy: isize, wrap: bool, scroll: bool) {
        let w = self.width as isize;
        let h = self.height as isize;
        let mut x = self.cursor.x as isize;
        let mut y = self.cursor.y as isize;

        if wrap && self.auto_wrap {
            x += dx;
            while x < 0 {
                x += w;
                y -= 1;
            }
            while x >= w {
                x -= w;
                y += 1;
            }
        } else {
            x = (x + dx).clamp(0, w - 1);
        }

        y += dy;
        if scroll {
            let top = self.top_margin as isize;
            let bottom = self.bottom_margin as isize;
            if y < top {
                self.scroll(self.top_margin, self.bottom_margin, top - y);
                y = top;
            }
            if y > bottom {
                self.scroll(self.top_margin, self.bottom_margin, bottom - y);
                y = bottom;
            }
        } else {
            y = y.clamp(0, h - 1);
        }

        debug_assert!(
            (0..w).contains(&x) && (0..h).contains(&y),
            "cursor escaped grid: ({x},{y}) in {w}x{h}"
        );
        self.cursor = Pos::new(x as usize, y as usize);
    }

    /// Absolute cursor motion, clamped to the grid.
    pub fn set_cursor_pos(&mut self, x: usize, y: usize) {
        self.cursor.x = x.min(self.width - 1);
        self.cursor.y = y.min(self.height - 1);
    }

    /// Update the scroll margins. Out-of-range values are clamped; an
    /// out-of-order pair is rejected so `top <= bottom` always holds.
    pub fn set_margins(&mut self, top: usize, bottom: usize) {
        let top = top.min(self.height - 1);
        let bottom = bottom.min(self.height - 1);
        if top > bottom {
            log::debug!("ignoring scroll margins out of order: {top} > {bottom}");
            return;
        }
        self.top_margin = top;
        self.bottom_margin = bottom;
    }

    /// Shift rows in the inclusive range `[y1, y2]` by `dy`. Positive `dy`
    /// moves content down, blanking `[y1, y1+dy)`; negative moves content
    /// up, blanking `(y2+dy, y2]`. Blanked rows use the current pen.
    pub fn scroll(&mut self, y1: usize, y2: usize, dy: isize) {
        let y1 = y1.min(self.height - 1);
        let y2 = y2.min(self.height - 1);
        if y1 > y2 {
            log::warn!("scroll bounds out of order: {y1} > {y2} (dy {dy})");
            return;
        }
        if dy == 0 {
            return;
        }

        let span = y2 - y1 + 1;
        let n = dy.unsigned_abs().min(span);
        if dy > 0 {
            for y in ((y1 + n)..=y2).rev() {
                self.copy_row(y - n, y);
            }
            self.erase(
                Region::new(0, y1, self.width, y1 + n),
                ChangeReason::Scroll,
            );
        } else {
            if n < span {
                for y in y1..=(y2 - n) {
                    self.copy_row(y + n, y);
                }
            }
            self.erase(
                Region::new(0, y2 + 1 - n, self.width, y2 + 1),
                ChangeReason::Scroll,
            );
        }
    }

    fn copy_row(&mut self, src: usize, dst: usize) {
        let w = self.width;
        let s = src * w;
        self.runes.copy_within(s..s + w, dst * w);
        self.fg.copy_within(s..s + w, dst * w);
        self.bg.copy_within(s..s + w, dst * w);
    }

    /// Reallocate the planes to `w × h`, preserving the top-left
    /// `min(w, W) × min(h, H)` sub-grid and filling new cells with spaces in
    /// the current pen. The bottom margin keeps its distance from the bottom
    /// edge; the cursor is brought back in range.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn set_size(&mut self, w: usize, h: usize) {
        assert!(w > 0 && h > 0, "grid dimensions must be positive");
        let min_w = w.min(self.width);
        let min_h = h.min(self.height);

        let mut runes = vec![' '; w * h];
        let mut fg = vec![self.pen_fg; w * h];
        let mut bg = vec![self.pen_bg; w * h];
        for y in 0..min_h {
            let src = y * self.width;
            let dst = y * w;
            runes[dst..dst + min_w].copy_from_slice(&self.runes[src..src + min_w]);
            fg[dst..dst + min_w].copy_from_slice(&self.fg[src..src + min_w]);
            bg[dst..dst + min_w].copy_from_slice(&self.bg[src..src + min_w]);
        }
        self.runes = runes;
        self.fg = fg;
        self.bg = bg;

        let delta = h as isize - self.height as isize;
        let bottom = (self.bottom_margin as isize + delta).clamp(0, h as isize - 1);
        self.bottom_margin = bottom as usize;
        self.top_margin = self.top_margin.min(self.bottom_margin);

        self.width = w;
        self.height = h;

        if self.cursor.x >= w {
            self.cursor.x = 0;
        }
        if self.cursor.y >= h {
            self.cursor.y = 0;
        }
    }

    /// Render row `y` as a string that reproduces its styling when written
    /// to a compliant terminal: one SGR prefix per span of identical
    /// `(fg, bg)`, then the span's runes.
    pub fn render_row_ansi(&self, y: usize) -> String {
        if y >= self.height {
            return String::new();
        }
        let row = y * self.width;
        let mut out = String::with_capacity(self.width + 16);
        let mut x = 0;
        while x < self.width {
            let fg = self.fg[row + x];
            let bg = self.bg[row + x];
            out.push_str(&ansi_escape(fg, bg));
            while x < self.width && self.fg[row + x] == fg && self.bg[row + x] == bg {
                out.push(self.runes[row + x]);
                x += 1;
            }
        }
        out
    }
}
