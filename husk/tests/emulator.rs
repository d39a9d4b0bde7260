//! End-to-end emulator tests over a live PTY
//!
//! These spawn real children on the slave side and poll snapshots with
//! deadlines, so they tolerate scheduler noise on slow machines.

use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use husk::{Emulator, Error, MouseEncoding, MouseMode};

const DEADLINE: Duration = Duration::from_secs(10);

fn wait_for<F: Fn() -> bool>(pred: F) -> bool {
    let start = Instant::now();
    while start.elapsed() < DEADLINE {
        if pred() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

fn snapshot_contains(emu: &Emulator, needle: &str) -> bool {
    emu.snapshot().rows.iter().any(|row| row.contains(needle))
}

fn sh(script: &str) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(script);
    cmd
}

#[test]
fn test_new_allocates_both_grids_and_pty() {
    let emu = Emulator::new(80, 24).unwrap();
    let frame = emu.snapshot();
    assert_eq!(frame.rows.len(), 24);
    assert!(frame.rows[0].contains(&" ".repeat(80)));
    emu.close();
}

#[test]
fn test_invalid_size_rejected() {
    assert!(matches!(
        Emulator::new(0, 24),
        Err(Error::InvalidSize { .. })
    ));
    assert!(matches!(
        Emulator::new(80, 0),
        Err(Error::InvalidSize { .. })
    ));
}

#[test]
fn test_id_is_uuid_shaped() {
    let emu = Emulator::new(10, 4).unwrap();
    assert_eq!(emu.id().len(), 36);
    assert_eq!(emu.id().matches('-').count(), 4);

    let other = Emulator::new(10, 4).unwrap();
    assert_ne!(emu.id(), other.id());
}

#[test]
fn test_child_output_reaches_snapshot() {
    let emu = Emulator::new(80, 24).unwrap();
    emu.start_command(sh("printf 'hello-from-child'")).unwrap();
    assert!(
        wait_for(|| snapshot_contains(&emu, "hello-from-child")),
        "child output never showed up: {:?}",
        emu.snapshot().rows
    );
    emu.close();
}

#[test]
fn test_child_control_sequences_apply() {
    let emu = Emulator::new(40, 10).unwrap();
    emu.start_command(sh("printf '\\033[2;5HMARK'")).unwrap();
    assert!(wait_for(|| snapshot_contains(&emu, "MARK")));
    let frame = emu.snapshot();
    assert!(
        frame.rows[1].contains("MARK"),
        "MARK not on row 1: {frame:?}"
    );
    emu.close();
}

#[test]
fn test_exit_flag_and_callback() {
    let emu = Emulator::new(20, 5).unwrap();
    let fired = Arc::new(AtomicBool::new(false));
    let seen_id = Arc::new(Mutex::new(String::new()));
    {
        let fired = Arc::clone(&fired);
        let seen_id = Arc::clone(&seen_id);
        emu.set_on_exit(move |event| {
            *seen_id.lock().unwrap() = event.id.clone();
            assert!(event.error.is_none(), "clean exit reported {:?}", event.error);
            fired.store(true, Ordering::SeqCst);
        });
    }

    emu.start_command(sh("exit 0")).unwrap();
    assert!(wait_for(|| emu.is_process_exited()));
    assert!(wait_for(|| fired.load(Ordering::SeqCst)));
    assert_eq!(*seen_id.lock().unwrap(), emu.id());
    emu.close();
}

#[test]
fn test_nonzero_exit_delivered_as_error() {
    let emu = Emulator::new(20, 5).unwrap();
    let code = Arc::new(Mutex::new(None));
    {
        let code = Arc::clone(&code);
        emu.set_on_exit(move |event| {
            if let Some(Error::ChildExit(n)) = event.error {
                *code.lock().unwrap() = Some(n);
            }
        });
    }

    emu.start_command(sh("exit 3")).unwrap();
    assert!(wait_for(|| code.lock().unwrap().is_some()));
    assert_eq!(*code.lock().unwrap(), Some(3));
    emu.close();
}

#[test]
fn test_send_key_round_trip_through_child() {
    let emu = Emulator::new(40, 6).unwrap();
    // cat echoes the typed line back through the PTY into the grid.
    emu.start_command(Command::new("/bin/cat")).unwrap();
    std::thread::sleep(Duration::from_millis(200));
    for key in ["p", "o", "n", "g", "enter"] {
        emu.send_key(key).unwrap();
    }
    assert!(
        wait_for(|| snapshot_contains(&emu, "pong")),
        "echo never arrived: {:?}",
        emu.snapshot().rows
    );
    emu.close();
}

#[test]
fn test_unknown_key_is_swallowed() {
    let emu = Emulator::new(20, 5).unwrap();
    emu.send_key("definitely-not-a-key").unwrap();
    emu.close();
}

#[test]
fn test_send_mouse_implicitly_enables_reporting() {
    let emu = Emulator::new(20, 5).unwrap();
    assert_eq!(emu.mouse_mode(), MouseMode::None);
    emu.send_mouse(0, 5, 10, true).unwrap();
    assert_eq!(emu.mouse_mode(), MouseMode::PressReleaseMotionAll);
    assert_eq!(emu.mouse_encoding(), MouseEncoding::Sgr);
    emu.close();
}

#[test]
fn test_resize_applies_to_snapshot() {
    let emu = Emulator::new(80, 24).unwrap();
    emu.resize(40, 10).unwrap();
    assert_eq!(emu.snapshot().rows.len(), 10);
    emu.close();
}

#[test]
fn test_resize_rejects_zero() {
    let emu = Emulator::new(80, 24).unwrap();
    assert!(matches!(
        emu.resize(0, 10),
        Err(Error::InvalidSize { .. })
    ));
    emu.close();
}

#[test]
fn test_close_is_idempotent() {
    let emu = Emulator::new(20, 5).unwrap();
    emu.close();
    emu.close();
    assert!(matches!(emu.send_key("a"), Err(Error::PtyNotInitialized)));
    assert!(matches!(emu.resize(10, 5), Err(Error::PtyNotInitialized)));
    // Snapshots still serve the last-known grid.
    assert_eq!(emu.snapshot().rows.len(), 5);
}

#[test]
fn test_frame_rate_is_advisory_metadata() {
    let emu = Emulator::new(20, 5).unwrap();
    emu.set_frame_rate(60);
    assert_eq!(emu.frame_rate(), Duration::from_secs(1) / 60);
    emu.set_frame_rate(0);
    assert_eq!(emu.frame_rate(), Duration::from_secs(1) / 60);
    emu.close();
}
