//! Attaching child processes to the slave side of a PTY
//!
//! The child gets the slave as stdin/stdout/stderr, its own session, and
//! the slave as controlling TTY, with `TERM` forced to `xterm-256color`.

use std::fs::File;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};

use crate::error::{Error, Result};

/// Wire `cmd` to the slave end and start it.
///
/// The closure run between fork and exec calls `setsid` and claims the
/// controlling TTY through the freshly dup'ed stdin, which is the slave.
pub fn attach_command(cmd: &mut Command, slave: &File) -> Result<Child> {
    cmd.env("TERM", "xterm-256color");
    cmd.stdin(Stdio::from(slave.try_clone()?));
    cmd.stdout(Stdio::from(slave.try_clone()?));
    cmd.stderr(Stdio::from(slave.try_clone()?));

    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid().map_err(std::io::Error::from)?;
            if libc::ioctl(0, libc::TIOCSCTTY as libc::c_ulong, 0) < 0 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    cmd.spawn().map_err(|e| Error::SpawnFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pty::{Pty, WindowSize};
    use std::io::Read;
    use std::time::{Duration, Instant};

    fn read_master_until<F>(pty: &Pty, deadline: Duration, pred: F) -> String
    where
        F: Fn(&str) -> bool,
    {
        let mut reader = pty.reader().unwrap();
        let mut out = String::new();
        let mut buf = [0u8; 4096];
        let start = Instant::now();
        while start.elapsed() < deadline {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    out.push_str(&String::from_utf8_lossy(&buf[..n]));
                    if pred(&out) {
                        break;
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(_) => break,
            }
        }
        out
    }

    #[test]
    fn test_spawn_echo_on_slave() {
        let pty = Pty::open(WindowSize::default()).unwrap();
        let mut cmd = Command::new("/bin/echo");
        cmd.arg("pty-hello");
        let mut child = attach_command(&mut cmd, pty.slave()).unwrap();

        let out = read_master_until(&pty, Duration::from_secs(5), |s| s.contains("pty-hello"));
        assert!(out.contains("pty-hello"), "child output not seen: {out:?}");
        let _ = child.wait();
    }

    #[test]
    fn test_term_is_forced() {
        let pty = Pty::open(WindowSize::default()).unwrap();
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg("printf '%s' \"$TERM\"");
        cmd.env("TERM", "dumb");
        let mut child = attach_command(&mut cmd, pty.slave()).unwrap();

        let out = read_master_until(&pty, Duration::from_secs(5), |s| {
            s.contains("xterm-256color")
        });
        assert!(out.contains("xterm-256color"), "TERM not forced: {out:?}");
        let _ = child.wait();
    }

    #[test]
    fn test_spawn_missing_program_fails() {
        let pty = Pty::open(WindowSize::default()).unwrap();
        let mut cmd = Command::new("/nonexistent/definitely-not-here");
        let err = attach_command(&mut cmd, pty.slave());
        assert!(err.is_err());
    }
}
