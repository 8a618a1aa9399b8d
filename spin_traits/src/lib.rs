//! Capability traits for the wash apparatus.
//!
//! The sequencer only ever talks to devices through these traits. Errors cross
//! the boundary as boxed trait objects; `spin_core::hw_error` maps them back to
//! typed errors.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::time::Duration;

pub type DeviceError = Box<dyn std::error::Error + Send + Sync>;

/// Multi-port syringe pump: a rotary valve in front of a single plunger.
pub trait Pump {
    /// Rotate the valve to a physical position (1-based).
    fn select_port(&mut self, position: u8) -> Result<(), DeviceError>;
    /// Draw `volume_ul` microliters through the selected port.
    fn withdraw(&mut self, volume_ul: u32) -> Result<(), DeviceError>;
    /// Push `volume_ul` microliters out through the selected port.
    fn dispense(&mut self, volume_ul: u32) -> Result<(), DeviceError>;
    /// Drive the plunger back to zero, expelling whatever it holds.
    fn reset_plunger(&mut self) -> Result<(), DeviceError>;

    fn address(&mut self) -> Result<u8, DeviceError>;
    fn baud_rate(&mut self) -> Result<u32, DeviceError>;
    fn firmware_version(&mut self) -> Result<String, DeviceError>;
}

/// Snapshot reported by the stepper controller.
#[derive(Debug, Clone, PartialEq)]
pub struct MotorStatus {
    pub name: String,
    pub serial: String,
    pub firmware: String,
    /// Supply voltage in volts.
    pub supply_voltage: f32,
    pub energized: bool,
}

/// Stepper controller driving the agitator.
pub trait Motor {
    fn query_status(&mut self) -> Result<MotorStatus, DeviceError>;
    fn energize(&mut self) -> Result<(), DeviceError>;
    fn deenergize(&mut self) -> Result<(), DeviceError>;
    fn exit_safe_start(&mut self) -> Result<(), DeviceError>;
    /// Target velocity in microsteps per 10000 s; sign selects direction.
    fn set_velocity(&mut self, velocity: i32) -> Result<(), DeviceError>;
    fn halt_and_hold(&mut self) -> Result<(), DeviceError>;
}

/// The human at the bench.
pub trait Operator {
    /// Narrate a status line.
    fn say(&mut self, message: &str);

    /// Block until the operator answers. `Ok(None)` means input is closed.
    fn ask(&mut self, prompt: &str) -> Result<Option<String>, DeviceError>;

    /// Called about once per second during timed waits.
    fn progress(&mut self, _label: &str, _remaining: Duration) {}
}
