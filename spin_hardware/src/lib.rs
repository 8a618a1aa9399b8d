pub mod error;
pub mod plunger;
pub mod runze;
#[cfg(all(feature = "hardware", unix))]
pub mod serial;
pub mod tic;
pub mod util;

pub use plunger::{Plunger, PumpGeometry};
pub use runze::{LinkTiming, RunzePump};
pub use tic::TicCmdMotor;

use error::HwError;
use spin_traits::{DeviceError, Motor, MotorStatus, Pump};
use tracing::debug;

/// Simulated syringe pump: tracks valve and plunger, moves nothing.
pub struct SimulatedPump {
    geometry: PumpGeometry,
    plunger: Plunger,
    valve: Option<u8>,
    fault: Option<String>,
}

impl SimulatedPump {
    pub fn new(geometry: PumpGeometry) -> Self {
        SimulatedPump {
            geometry,
            plunger: Plunger::new(geometry.syringe_volume_ul),
            valve: None,
            fault: None,
        }
    }

    /// Every subsequent call fails with `reason`, as an unplugged pump would.
    pub fn with_fault(mut self, reason: impl Into<String>) -> Self {
        self.fault = Some(reason.into());
        self
    }

    pub fn valve(&self) -> Option<u8> {
        self.valve
    }

    pub fn held_ul(&self) -> u32 {
        self.plunger.held_ul()
    }

    fn check_fault(&self) -> error::Result<()> {
        match &self.fault {
            Some(reason) => Err(HwError::Simulated(reason.clone())),
            None => Ok(()),
        }
    }
}

impl Pump for SimulatedPump {
    fn select_port(&mut self, position: u8) -> Result<(), DeviceError> {
        self.check_fault()?;
        self.geometry.check_port(position)?;
        debug!(position, "valve (simulated)");
        self.valve = Some(position);
        Ok(())
    }

    fn withdraw(&mut self, volume_ul: u32) -> Result<(), DeviceError> {
        self.check_fault()?;
        self.plunger.draw(volume_ul)?;
        debug!(volume_ul, held_ul = self.plunger.held_ul(), "withdraw (simulated)");
        Ok(())
    }

    fn dispense(&mut self, volume_ul: u32) -> Result<(), DeviceError> {
        self.check_fault()?;
        self.plunger.expel(volume_ul)?;
        debug!(volume_ul, held_ul = self.plunger.held_ul(), "dispense (simulated)");
        Ok(())
    }

    fn reset_plunger(&mut self) -> Result<(), DeviceError> {
        self.check_fault()?;
        self.plunger.empty();
        debug!("reset plunger (simulated)");
        Ok(())
    }

    fn address(&mut self) -> Result<u8, DeviceError> {
        self.check_fault()?;
        Ok(0)
    }

    fn baud_rate(&mut self) -> Result<u32, DeviceError> {
        self.check_fault()?;
        Ok(9600)
    }

    fn firmware_version(&mut self) -> Result<String, DeviceError> {
        self.check_fault()?;
        Ok("sim".to_string())
    }
}

/// Simulated stepper controller.
#[derive(Debug, Default)]
pub struct SimulatedMotor {
    energized: bool,
    velocity: i32,
}

impl SimulatedMotor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn energized(&self) -> bool {
        self.energized
    }

    pub fn velocity(&self) -> i32 {
        self.velocity
    }
}

impl Motor for SimulatedMotor {
    fn query_status(&mut self) -> Result<MotorStatus, DeviceError> {
        Ok(MotorStatus {
            name: "Simulated Tic".to_string(),
            serial: "00000000".to_string(),
            firmware: "sim".to_string(),
            supply_voltage: 12.0,
            energized: self.energized,
        })
    }

    fn energize(&mut self) -> Result<(), DeviceError> {
        self.energized = true;
        debug!("motor energized (simulated)");
        Ok(())
    }

    fn deenergize(&mut self) -> Result<(), DeviceError> {
        self.energized = false;
        self.velocity = 0;
        debug!("motor deenergized (simulated)");
        Ok(())
    }

    fn exit_safe_start(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn set_velocity(&mut self, velocity: i32) -> Result<(), DeviceError> {
        self.velocity = if self.energized { velocity } else { 0 };
        debug!(velocity = self.velocity, "motor velocity (simulated)");
        Ok(())
    }

    fn halt_and_hold(&mut self) -> Result<(), DeviceError> {
        self.velocity = 0;
        Ok(())
    }
}
