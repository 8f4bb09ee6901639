//! Physical link to the servo controller board.
//!
//! The [`ServoBus`] trait is the only thing the servo bank needs from the
//! hardware. [`MaestroBus`] speaks the Pololu Maestro compact protocol over a
//! serial character device. The device is switched to raw mode on open so
//! the tty layer passes command bytes such as `0x0A` through untranslated.

use crate::error::{Error, Result};
use log::{debug, info};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Per-channel pulse output
pub trait ServoBus: Send {
    /// Drive `channel` with the given pulse width in microseconds
    fn set_target(&mut self, channel: u8, pulse_width: u16) -> Result<()>;

    /// Stop sending pulses on `channel`
    fn set_off(&mut self, channel: u8) -> Result<()>;

    /// Release the link. Calling this more than once has no further effect.
    fn close(&mut self) -> Result<()>;
}

const SET_TARGET: u8 = 0x84;

/// Largest pulse width, in microseconds, a compact-protocol target can carry.
/// The target is sent in quarter-microseconds as two 7-bit bytes.
pub const MAX_TARGET_PW: u16 = 0x3FFF / 4;

/// Encode a compact-protocol `Set Target` command.
///
/// The target is expressed in quarter-microseconds; a target of 0 turns the
/// channel off.
#[must_use]
pub fn encode_set_target(channel: u8, quarter_micros: u16) -> [u8; 4] {
    [
        SET_TARGET,
        channel & 0x7F,
        (quarter_micros & 0x7F) as u8,
        ((quarter_micros >> 7) & 0x7F) as u8,
    ]
}

/// Pololu Maestro servo controller on a serial port
pub struct MaestroBus<W: Write + Send> {
    port: Option<W>,
}

impl MaestroBus<File> {
    /// Open the controller's command port, e.g. `/dev/ttyACM0`, in raw mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareUnavailable`] if the device cannot be opened
    /// or is not a terminal device.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut options = OpenOptions::new();
        options.read(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.custom_flags(libc::O_NOCTTY);
        }
        let port = options
            .open(path)
            .map_err(|e| Error::HardwareUnavailable(format!("{}: {e}", path.display())))?;

        #[cfg(unix)]
        make_raw(&port).map_err(|e| Error::HardwareUnavailable(format!("{}: {e}", path.display())))?;

        info!("Opened servo controller at {}", path.display());
        Ok(Self::new(port))
    }
}

/// Disable output post-processing, echo and line discipline on a tty
#[cfg(unix)]
fn make_raw(port: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let fd = port.as_raw_fd();
    // SAFETY: `fd` stays open for the duration of the calls because `port`
    // is borrowed, and `termios` is filled in by `tcgetattr` before use.
    unsafe {
        let mut termios: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut termios) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        libc::cfmakeraw(&mut termios);
        if libc::tcsetattr(fd, libc::TCSANOW, &termios) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    debug!("Servo port switched to raw mode");
    Ok(())
}

impl<W: Write + Send> MaestroBus<W> {
    /// Wrap an already open writer
    pub fn new(port: W) -> Self {
        Self { port: Some(port) }
    }

    fn write_command(&mut self, command: [u8; 4]) -> Result<()> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| Error::Bus("servo bus already closed".to_string()))?;
        port.write_all(&command)
            .and_then(|()| port.flush())
            .map_err(|e| Error::Bus(format!("write failed: {e}")))
    }
}

impl<W: Write + Send> ServoBus for MaestroBus<W> {
    fn set_target(&mut self, channel: u8, pulse_width: u16) -> Result<()> {
        // Wider pulses do not fit the two 7-bit target bytes
        let quarter_micros = pulse_width.min(MAX_TARGET_PW) * 4;
        self.write_command(encode_set_target(channel, quarter_micros))
    }

    fn set_off(&mut self, channel: u8) -> Result<()> {
        self.write_command(encode_set_target(channel, 0))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            debug!("Closing servo bus");
            port.flush()?;
        }
        Ok(())
    }
}
