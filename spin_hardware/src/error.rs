use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("serial port error: {0}")]
    Serial(String),
    #[error("pump reply timeout")]
    Timeout,
    #[error("pump still busy after {0:?}")]
    BusyTimeout(Duration),
    #[error("malformed pump frame: {0}")]
    Frame(String),
    #[error("pump reported status 0x{code:02x} ({meaning})")]
    PumpStatus { code: u8, meaning: &'static str },
    #[error(
        "plunger capacity exceeded: holding {held_ul} uL, cannot draw {requested_ul} uL more (syringe {capacity_ul} uL)"
    )]
    Capacity {
        held_ul: u32,
        requested_ul: u32,
        capacity_ul: u32,
    },
    #[error("plunger underflow: holding {held_ul} uL, cannot dispense {requested_ul} uL")]
    Underflow { held_ul: u32, requested_ul: u32 },
    #[error("valve position {position} out of range 1..={count}")]
    InvalidPort { position: u8, count: u8 },
    #[error("ticcmd {args} failed ({status}): {stderr}")]
    Command {
        args: String,
        status: String,
        stderr: String,
    },
    #[error("unparseable ticcmd status: {0}")]
    Status(String),
    #[error("simulated fault: {0}")]
    Simulated(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
