//! What a terminal device receives from the Maestro bus
#![cfg(target_os = "linux")]

use inmoov_vision::servo_bus::{encode_set_target, MaestroBus, ServoBus};
use std::ffi::CStr;
use std::fs::File;
use std::io::Read;
use std::os::unix::io::FromRawFd;

/// Pseudo-terminal pair: the master end and the slave's device path
fn open_pty() -> (File, File, String) {
    let mut master = 0;
    let mut slave = 0;
    // SAFETY: out-pointers are valid; name, termios and winsize are optional
    let rc = unsafe {
        libc::openpty(
            &mut master,
            &mut slave,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
        )
    };
    assert_eq!(rc, 0, "openpty failed");

    // SAFETY: `slave` is an open terminal descriptor
    let name = unsafe { CStr::from_ptr(libc::ttyname(slave)) }
        .to_string_lossy()
        .into_owned();
    // SAFETY: both descriptors are freshly opened and owned here
    let (master, slave) = unsafe { (File::from_raw_fd(master), File::from_raw_fd(slave)) };
    (master, slave, name)
}

fn read_bytes(master: &mut File, count: usize) -> Vec<u8> {
    let mut received = vec![0u8; count];
    master.read_exact(&mut received).unwrap();
    received
}

#[test]
fn test_tilt_channel_reaches_device_untranslated() {
    let (mut master, _slave, path) = open_pty();
    let mut bus = MaestroBus::open(&path).unwrap();

    // Channel 10 is 0x0A, which a cooked tty would expand to 0x0D 0x0A
    bus.set_target(10, 1900).unwrap();
    assert_eq!(read_bytes(&mut master, 4), vec![0x84, 0x0A, 0x30, 0x3B]);

    bus.set_off(10).unwrap();
    assert_eq!(read_bytes(&mut master, 4), vec![0x84, 0x0A, 0x00, 0x00]);
    bus.close().unwrap();
}

#[test]
fn test_target_bytes_with_newline_value_pass_through() {
    let (mut master, _slave, path) = open_pty();
    let mut bus = MaestroBus::open(&path).unwrap();

    // 320us = 1280 quarter-us = 0x0A << 7
    bus.set_target(2, 320).unwrap();
    let expected = encode_set_target(2, 1280);
    assert_eq!(expected[3], 0x0A);
    assert_eq!(read_bytes(&mut master, 4), expected.to_vec());
    bus.close().unwrap();
}
