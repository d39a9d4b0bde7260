//! PTY (pseudoterminal) pair management
//!
//! Both ends are held for the lifetime of the pair: the master carries the
//! emulator's I/O, and keeping the slave open means the master stays usable
//! across child restarts instead of hitting EIO when the last child exits.

use std::fs::File;
use std::io::{self, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

use nix::pty::openpty;

use crate::error::{Error, Result};

/// Window size in character cells and pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    /// Number of rows (cells)
    pub rows: u16,
    /// Number of columns (cells)
    pub cols: u16,
    /// Width in pixels (0 when unknown)
    pub pixel_width: u16,
    /// Height in pixels (0 when unknown)
    pub pixel_height: u16,
}

impl WindowSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        }
    }

    pub fn with_pixels(cols: u16, rows: u16, pixel_width: u16, pixel_height: u16) -> Self {
        Self {
            rows,
            cols,
            pixel_width,
            pixel_height,
        }
    }

    pub fn to_winsize(self) -> libc::winsize {
        libc::winsize {
            ws_row: self.rows,
            ws_col: self.cols,
            ws_xpixel: self.pixel_width,
            ws_ypixel: self.pixel_height,
        }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

impl From<libc::winsize> for WindowSize {
    fn from(ws: libc::winsize) -> Self {
        Self {
            rows: ws.ws_row,
            cols: ws.ws_col,
            pixel_width: ws.ws_xpixel,
            pixel_height: ws.ws_ypixel,
        }
    }
}

/// An open master/slave pseudoterminal pair
pub struct Pty {
    master: File,
    slave: File,
}

impl Pty {
    /// Open a new pair sized to `size`.
    pub fn open(size: WindowSize) -> Result<Self> {
        let ends = openpty(None::<&nix::pty::Winsize>, None::<&nix::sys::termios::Termios>)
            .map_err(|e| Error::PtyCreation(e.to_string()))?;
        let pty = Self {
            master: File::from(ends.master),
            slave: File::from(ends.slave),
        };
        pty.set_window_size(size)?;
        Ok(pty)
    }

    /// The slave end, for wiring a child's stdio.
    pub fn slave(&self) -> &File {
        &self.slave
    }

    pub fn master_fd(&self) -> RawFd {
        self.master.as_raw_fd()
    }

    /// Push the kernel's window size; the foreground process group gets a
    /// SIGWINCH from the tty driver.
    pub fn set_window_size(&self, size: WindowSize) -> Result<()> {
        let ws = size.to_winsize();
        let rc = unsafe {
            libc::ioctl(
                self.master.as_raw_fd(),
                libc::TIOCSWINSZ as libc::c_ulong,
                &ws,
            )
        };
        if rc == -1 {
            Err(Error::WindowSize(io::Error::last_os_error().to_string()))
        } else {
            Ok(())
        }
    }

    pub fn get_window_size(&self) -> Result<WindowSize> {
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        let rc = unsafe {
            libc::ioctl(
                self.master.as_raw_fd(),
                libc::TIOCGWINSZ as libc::c_ulong,
                &mut ws,
            )
        };
        if rc == -1 {
            Err(Error::WindowSize(io::Error::last_os_error().to_string()))
        } else {
            Ok(WindowSize::from(ws))
        }
    }

    /// A non-blocking duplicate of the master for a dedicated reader.
    pub fn reader(&self) -> Result<File> {
        let dup = self.master.try_clone()?;
        set_nonblocking(dup.as_raw_fd())?;
        Ok(dup)
    }

    /// Write the full buffer to the master (input for the child).
    pub fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        (&self.master).write_all(buf)
    }
}

impl AsRawFd for Pty {
    fn as_raw_fd(&self) -> RawFd {
        self.master.as_raw_fd()
    }
}

impl AsFd for Pty {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.master.as_fd()
    }
}

fn set_nonblocking(fd: RawFd) -> Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(Error::Io(io::Error::last_os_error()));
    }
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(Error::Io(io::Error::last_os_error()));
    }
    Ok(())
}
