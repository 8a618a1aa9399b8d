//! Runze SY-01B multichannel syringe pump over a byte stream.
//!
//! Every exchange is a fixed 8-byte frame in each direction:
//!
//! ```text
//! request:  CC addr func p_lo p_hi DD sum_lo sum_hi
//! reply:    CC addr stat p_lo p_hi DD sum_lo sum_hi
//! ```
//!
//! `sum` is the 16-bit wrapping sum of the first six bytes. Motion commands
//! are acknowledged immediately; completion is observed by polling the motor
//! status until it leaves the busy state.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use spin_traits::{DeviceError, Pump};
use tracing::{debug, trace};

use crate::error::{HwError, Result};
use crate::plunger::{Plunger, PumpGeometry};
use crate::util::poll_until;

const STX: u8 = 0xCC;
const ETX: u8 = 0xDD;
pub const FRAME_LEN: usize = 8;

/// Function codes understood by the pump.
pub mod func {
    pub const GET_ADDRESS: u8 = 0x20;
    pub const GET_RS232_BAUD: u8 = 0x21;
    pub const GET_FIRMWARE: u8 = 0x3F;
    pub const GET_MOTOR_STATUS: u8 = 0x4A;
    pub const PUSH_STEPS: u8 = 0x42;
    pub const PULL_STEPS: u8 = 0x43;
    pub const VALVE_TO_PORT: u8 = 0x44;
    pub const RESET_SYRINGE: u8 = 0x45;
}

pub const STATUS_OK: u8 = 0x00;
pub const STATUS_EXECUTING: u8 = 0xFE;

fn status_meaning(code: u8) -> &'static str {
    match code {
        0x01 => "frame error",
        0x02 => "parameter error",
        0x03 => "optocoupler error",
        0x04 => "motor busy",
        0x05 => "motor stalled",
        0x06 => "unknown position",
        0xFF => "unknown error",
        _ => "unrecognized status",
    }
}

const RS232_BAUDS: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

/// Decoded reply frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub status: u8,
    pub param: u16,
}

fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |acc, b| acc.wrapping_add(u16::from(*b)))
}

pub fn encode(address: u8, func: u8, param: u16) -> [u8; FRAME_LEN] {
    let p = param.to_le_bytes();
    let mut frame = [STX, address, func, p[0], p[1], ETX, 0, 0];
    let sum = checksum(&frame[..6]).to_le_bytes();
    frame[6] = sum[0];
    frame[7] = sum[1];
    frame
}

pub fn decode(frame: &[u8; FRAME_LEN], address: u8) -> Result<Reply> {
    if frame[0] != STX || frame[5] != ETX {
        return Err(HwError::Frame(format!("bad delimiters in {frame:02x?}")));
    }
    let expected = checksum(&frame[..6]);
    let got = u16::from_le_bytes([frame[6], frame[7]]);
    if expected != got {
        return Err(HwError::Frame(format!(
            "checksum mismatch: expected {expected:#06x}, got {got:#06x}"
        )));
    }
    if frame[1] != address {
        return Err(HwError::Frame(format!(
            "reply from address {} while talking to {}",
            frame[1], address
        )));
    }
    Ok(Reply {
        status: frame[2],
        param: u16::from_le_bytes([frame[3], frame[4]]),
    })
}

/// Timing knobs for the pump link.
#[derive(Debug, Clone, Copy)]
pub struct LinkTiming {
    /// Give up waiting for a motion to finish after this long.
    pub busy_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(50),
        }
    }
}

pub struct RunzePump<T> {
    port: T,
    address: u8,
    geometry: PumpGeometry,
    timing: LinkTiming,
    plunger: Plunger,
    valve: Option<u8>,
}

impl<T: Read + Write> RunzePump<T> {
    pub fn new(port: T, address: u8, geometry: PumpGeometry, timing: LinkTiming) -> Self {
        Self {
            port,
            address,
            geometry,
            timing,
            plunger: Plunger::new(geometry.syringe_volume_ul),
            valve: None,
        }
    }

    pub fn valve(&self) -> Option<u8> {
        self.valve
    }

    pub fn held_ul(&self) -> u32 {
        self.plunger.held_ul()
    }

    /// Send one request and read its reply. Busy acknowledgements pass;
    /// every other non-zero status is a fault.
    pub fn transact(&mut self, func: u8, param: u16) -> Result<Reply> {
        let frame = encode(self.address, func, param);
        trace!(?frame, "pump tx");
        self.port.write_all(&frame)?;
        self.port.flush()?;

        let mut buf = [0u8; FRAME_LEN];
        self.port.read_exact(&mut buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof | ErrorKind::TimedOut | ErrorKind::WouldBlock => {
                HwError::Timeout
            }
            _ => HwError::Io(e),
        })?;
        trace!(?buf, "pump rx");
        let reply = decode(&buf, self.address)?;
        match reply.status {
            STATUS_OK | STATUS_EXECUTING => Ok(reply),
            code => Err(HwError::PumpStatus {
                code,
                meaning: status_meaning(code),
            }),
        }
    }

    fn wait_idle(&mut self) -> Result<()> {
        let LinkTiming {
            busy_timeout,
            poll_interval,
        } = self.timing;
        poll_until(
            || Ok(self.transact(func::GET_MOTOR_STATUS, 0)?.status == STATUS_OK),
            busy_timeout,
            poll_interval,
        )
    }

    fn run(&mut self, func: u8, param: u16) -> Result<()> {
        self.transact(func, param)?;
        self.wait_idle()
    }

    fn steps_param(&self, volume_ul: u32) -> Result<u16> {
        let steps = self.geometry.volume_to_steps(volume_ul);
        u16::try_from(steps).map_err(|_| {
            HwError::Frame(format!("{volume_ul} uL needs {steps} steps, beyond one frame"))
        })
    }

    pub fn move_valve(&mut self, position: u8) -> Result<()> {
        self.geometry.check_port(position)?;
        debug!(position, "pump valve");
        self.run(func::VALVE_TO_PORT, u16::from(position))?;
        self.valve = Some(position);
        Ok(())
    }

    pub fn pull(&mut self, volume_ul: u32) -> Result<()> {
        self.plunger.check_draw(volume_ul)?;
        let steps = self.steps_param(volume_ul)?;
        debug!(volume_ul, steps, "pump withdraw");
        self.run(func::PULL_STEPS, steps)?;
        self.plunger.draw(volume_ul)
    }

    pub fn push(&mut self, volume_ul: u32) -> Result<()> {
        self.plunger.check_expel(volume_ul)?;
        let steps = self.steps_param(volume_ul)?;
        debug!(volume_ul, steps, "pump dispense");
        self.run(func::PUSH_STEPS, steps)?;
        self.plunger.expel(volume_ul)
    }

    pub fn home(&mut self) -> Result<()> {
        debug!(held_ul = self.plunger.held_ul(), "pump reset plunger");
        self.run(func::RESET_SYRINGE, 0)?;
        self.plunger.empty();
        Ok(())
    }

    pub fn query_address(&mut self) -> Result<u8> {
        Ok((self.transact(func::GET_ADDRESS, 0)?.param & 0xFF) as u8)
    }

    pub fn query_baud(&mut self) -> Result<u32> {
        let idx = self.transact(func::GET_RS232_BAUD, 0)?.param;
        RS232_BAUDS
            .get(usize::from(idx))
            .copied()
            .ok_or_else(|| HwError::Frame(format!("unknown baud index {idx}")))
    }

    pub fn query_firmware(&mut self) -> Result<String> {
        let [minor, major] = self.transact(func::GET_FIRMWARE, 0)?.param.to_le_bytes();
        Ok(format!("{major}.{minor}"))
    }
}

impl<T: Read + Write> Pump for RunzePump<T> {
    fn select_port(&mut self, position: u8) -> std::result::Result<(), DeviceError> {
        Ok(self.move_valve(position)?)
    }

    fn withdraw(&mut self, volume_ul: u32) -> std::result::Result<(), DeviceError> {
        Ok(self.pull(volume_ul)?)
    }

    fn dispense(&mut self, volume_ul: u32) -> std::result::Result<(), DeviceError> {
        Ok(self.push(volume_ul)?)
    }

    fn reset_plunger(&mut self) -> std::result::Result<(), DeviceError> {
        Ok(self.home()?)
    }

    fn address(&mut self) -> std::result::Result<u8, DeviceError> {
        Ok(self.query_address()?)
    }

    fn baud_rate(&mut self) -> std::result::Result<u32, DeviceError> {
        Ok(self.query_baud()?)
    }

    fn firmware_version(&mut self) -> std::result::Result<String, DeviceError> {
        Ok(self.query_firmware()?)
    }
}
