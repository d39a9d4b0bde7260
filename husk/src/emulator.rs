//! The emulator shell: PTY ownership, reader thread, public operations
//!
//! One `RwLock` serializes every mutation of terminal state: the PTY reader
//! applies parsed bursts under the write lock, hosts snapshot under the read
//! lock, and input operations encode outside any lock before writing to the
//! PTY. The reader never blocks in the OS read while holding the lock.

use std::fs::File;
use std::io::Read;
use std::os::fd::AsFd;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use husk_pty::{attach_command, Pty, WindowSize};

use crate::error::{Error, Result};
use crate::input::{encode_key, encode_mouse};
use crate::settings::{MouseEncoding, MouseMode, ViewFlag, ViewString};
use crate::term::Terminal;

/// PTY read buffer size.
const READ_BUF_LEN: usize = 65536;
/// How long the reader sleeps in poll between stop-flag checks.
const READER_POLL_MS: u8 = 100;

/// A rendered frame: one ANSI-styled string per grid row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedFrame {
    pub rows: Vec<String>,
}

impl EmittedFrame {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Delivered to the exit callback when the child terminates
#[derive(Debug)]
pub struct ExitEvent {
    /// Id of the emulator whose child exited
    pub id: String,
    /// `Some` when the child exited non-zero
    pub error: Option<Error>,
}

type ExitCallback = Arc<dyn Fn(ExitEvent) + Send + Sync>;

struct Inner {
    term: Terminal,
    frame_rate: Duration,
    process_exited: bool,
    on_exit: Option<ExitCallback>,
}

/// A headless terminal emulator bound to one PTY pair
pub struct Emulator {
    id: String,
    inner: Arc<RwLock<Inner>>,
    pty: Arc<RwLock<Option<Pty>>>,
    stop: Arc<AtomicBool>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Emulator {
    /// Create an emulator with both screens sized `cols × rows` and a fresh
    /// PTY pair, and start the PTY reader.
    pub fn new(cols: usize, rows: usize) -> Result<Self> {
        let size = window_size(cols, rows)?;
        let pty = Pty::open(size)?;
        let reader_file = pty.reader()?;

        let inner = Arc::new(RwLock::new(Inner {
            term: Terminal::new(cols, rows),
            frame_rate: Duration::from_secs(1) / 30,
            process_exited: false,
            on_exit: None,
        }));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let inner = Arc::clone(&inner);
            let stop = Arc::clone(&stop);
            std::thread::Builder::new()
                .name("husk-pty-reader".into())
                .spawn(move || reader_loop(reader_file, inner, stop))?
        };

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            inner,
            pty: Arc::new(RwLock::new(Some(pty))),
            stop,
            reader: Mutex::new(Some(handle)),
        })
    }

    /// Stable opaque identifier for hosts multiplexing several emulators.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resize the PTY winsize and both screens.
    pub fn resize(&self, cols: usize, rows: usize) -> Result<()> {
        let size = window_size(cols, rows)?;
        {
            let guard = read_lock(&self.pty);
            let pty = guard.as_ref().ok_or(Error::PtyNotInitialized)?;
            pty.set_window_size(size)?;
        }
        write_lock(&self.inner).term.resize(cols, rows);
        Ok(())
    }

    /// Advisory polling rate for hosts; the emulator itself renders only on
    /// demand.
    pub fn set_frame_rate(&self, fps: u32) {
        if fps == 0 {
            return;
        }
        write_lock(&self.inner).frame_rate = Duration::from_secs(1) / fps;
    }

    pub fn frame_rate(&self) -> Duration {
        read_lock(&self.inner).frame_rate
    }

    /// Render every row of the current screen into fresh strings.
    pub fn snapshot(&self) -> EmittedFrame {
        let guard = read_lock(&self.inner);
        let grid = guard.term.grid();
        let rows = (0..grid.height()).map(|y| grid.render_row_ansi(y)).collect();
        EmittedFrame { rows }
    }

    /// Attach `cmd` to the slave side with `TERM=xterm-256color` and the
    /// slave as controlling TTY, and watch for its exit.
    pub fn start_command(&self, mut cmd: Command) -> Result<()> {
        let child = {
            let guard = read_lock(&self.pty);
            let pty = guard.as_ref().ok_or(Error::PtyNotInitialized)?;
            attach_command(&mut cmd, pty.slave())
                .map_err(|e| Error::ChildStart(e.to_string()))?
        };
        write_lock(&self.inner).process_exited = false;

        let inner = Arc::clone(&self.inner);
        let id = self.id.clone();
        std::thread::Builder::new()
            .name("husk-child-monitor".into())
            .spawn(move || monitor_child(child, inner, id))?;
        Ok(())
    }

    /// Register the single exit callback. It runs on the monitor thread
    /// after the emulator lock is released and must not call back into the
    /// emulator.
    pub fn set_on_exit<F>(&self, callback: F)
    where
        F: Fn(ExitEvent) + Send + Sync + 'static,
    {
        write_lock(&self.inner).on_exit = Some(Arc::new(callback));
    }

    pub fn is_process_exited(&self) -> bool {
        read_lock(&self.inner).process_exited
    }

    /// Encode a symbolic key name and write it to the PTY. Unknown names
    /// encode to nothing and succeed.
    pub fn send_key(&self, key: &str) -> Result<()> {
        let bytes = encode_key(key);
        if bytes.is_empty() {
            return Ok(());
        }
        self.write_pty(&bytes)
    }

    /// Encode a mouse event per the active mode and encoding and write it
    /// to the PTY. `button` is the wire button number, `-1` for motion.
    ///
    /// When mouse reporting is off this enables
    /// `PressReleaseMotionAll` + SGR first, matching the legacy behavior
    /// hosts rely on.
    pub fn send_mouse(&self, button: i32, x: u16, y: u16, pressed: bool) -> Result<()> {
        let (mode, encoding) = {
            let mut guard = write_lock(&self.inner);
            let settings = guard.term.settings_mut();
            if settings.mouse_mode() == MouseMode::None {
                settings.set_mouse_mode(MouseMode::PressReleaseMotionAll);
                settings.set_mouse_encoding(MouseEncoding::Sgr);
            }
            (settings.mouse_mode(), settings.mouse_encoding())
        };

        match encode_mouse(button, x, y, pressed, mode, encoding) {
            Some(bytes) => self.write_pty(&bytes),
            None => Ok(()),
        }
    }

    /// Current value of a boolean view flag.
    pub fn flag(&self, flag: ViewFlag) -> bool {
        read_lock(&self.inner).term.settings().flag(flag)
    }

    /// Current value of a string setting.
    pub fn view_string(&self, string: ViewString) -> String {
        read_lock(&self.inner)
            .term
            .settings()
            .string(string)
            .to_string()
    }

    pub fn mouse_mode(&self) -> MouseMode {
        read_lock(&self.inner).term.settings().mouse_mode()
    }

    pub fn mouse_encoding(&self) -> MouseEncoding {
        read_lock(&self.inner).term.settings().mouse_encoding()
    }

    /// Signal the reader to stop and release both PTY ends. Idempotent;
    /// subsequent I/O operations return [`Error::PtyNotInitialized`].
    pub fn close(&self) {
        self.stop.store(true, Ordering::Relaxed);
        write_lock(&self.pty).take();
        let handle = lock_mutex(&self.reader).take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn write_pty(&self, bytes: &[u8]) -> Result<()> {
        let guard = read_lock(&self.pty);
        let pty = guard.as_ref().ok_or(Error::PtyNotInitialized)?;
        pty.write_all(bytes)?;
        Ok(())
    }
}

impl Drop for Emulator {
    fn drop(&mut self) {
        self.close();
    }
}

fn window_size(cols: usize, rows: usize) -> Result<WindowSize> {
    if cols == 0 || rows == 0 || cols > u16::MAX as usize || rows > u16::MAX as usize {
        return Err(Error::InvalidSize { cols, rows });
    }
    let px_w = (cols * 8).min(u16::MAX as usize) as u16;
    let px_h = (rows * 16).min(u16::MAX as usize) as u16;
    Ok(WindowSize::with_pixels(cols as u16, rows as u16, px_w, px_h))
}

/// Dedicated PTY reader: poll, read a burst, apply it under the write lock,
/// then write any queued replies with the lock released.
fn reader_loop(file: File, inner: Arc<RwLock<Inner>>, stop: Arc<AtomicBool>) {
    let mut file = file;
    let mut buf = [0u8; READ_BUF_LEN];
    loop {
        if stop.load(Ordering::Relaxed) {
            return;
        }

        let mut fds = [PollFd::new(file.as_fd(), PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(READER_POLL_MS)) {
            Ok(0) => continue,
            Ok(_) => {}
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => {
                log::debug!("pty poll failed: {e}");
                return;
            }
        }

        match file.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => {
                let responses = {
                    let mut guard = write_lock(&inner);
                    guard.term.process(&buf[..n]);
                    guard.term.take_responses()
                };
                for response in responses {
                    use std::io::Write;
                    if (&file).write_all(&response).is_err() {
                        return;
                    }
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) => {
                log::debug!("pty read failed: {e}");
                return;
            }
        }
    }
}

/// Wait for the child, flag the exit, and deliver the callback outside the
/// lock.
fn monitor_child(mut child: std::process::Child, inner: Arc<RwLock<Inner>>, id: String) {
    let status = child.wait();

    let callback = {
        let mut guard = write_lock(&inner);
        guard.process_exited = true;
        guard.on_exit.clone()
    };

    let error = match status {
        Ok(status) if status.success() => None,
        Ok(status) => Some(Error::ChildExit(status.code().unwrap_or(-1))),
        Err(e) => Some(Error::Io(e)),
    };

    match &error {
        None => log::debug!("child of {id} exited cleanly"),
        Some(e) => log::debug!("child of {id} exited: {e}"),
    }

    if let Some(callback) = callback {
        callback(ExitEvent { id, error });
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn lock_mutex<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
