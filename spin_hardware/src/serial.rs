//! Raw-mode tty setup for the pump link.

use std::fs::{File, OpenOptions};
use std::path::Path;

use nix::sys::termios::{
    BaudRate, FlushArg, SetArg, SpecialCharacterIndices, cfmakeraw, cfsetspeed, tcflush,
    tcgetattr, tcsetattr,
};
use tracing::info;

use crate::error::{HwError, Result};

fn baud(rate: u32) -> Result<BaudRate> {
    Ok(match rate {
        9600 => BaudRate::B9600,
        19200 => BaudRate::B19200,
        38400 => BaudRate::B38400,
        57600 => BaudRate::B57600,
        115200 => BaudRate::B115200,
        other => return Err(HwError::Serial(format!("unsupported baud rate {other}"))),
    })
}

/// Open `path` as a raw 8N1 serial line at `baud_rate` with a 1 s read timeout.
pub fn open(path: &Path, baud_rate: u32) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| HwError::Serial(format!("open {}: {e}", path.display())))?;

    let mut tio = tcgetattr(&file).map_err(|e| HwError::Serial(format!("tcgetattr: {e}")))?;
    cfmakeraw(&mut tio);
    cfsetspeed(&mut tio, baud(baud_rate)?)
        .map_err(|e| HwError::Serial(format!("cfsetspeed: {e}")))?;
    // Non-canonical read: return after 1 s even if nothing arrived.
    tio.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
    tio.control_chars[SpecialCharacterIndices::VTIME as usize] = 10;
    tcsetattr(&file, SetArg::TCSANOW, &tio)
        .map_err(|e| HwError::Serial(format!("tcsetattr: {e}")))?;
    tcflush(&file, FlushArg::TCIOFLUSH).map_err(|e| HwError::Serial(format!("tcflush: {e}")))?;

    info!(port = %path.display(), baud_rate, "serial port open");
    Ok(file)
}
