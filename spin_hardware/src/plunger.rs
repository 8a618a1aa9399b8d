//! Syringe geometry and plunger bookkeeping shared by the real and simulated pumps.

use crate::error::{HwError, Result};

/// Physical layout of a multi-port syringe pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpGeometry {
    /// Number of valve positions (ports are numbered 1..=position_count).
    pub position_count: u8,
    pub syringe_volume_ul: u32,
    /// Motor steps for one full plunger stroke.
    pub full_stroke_steps: u32,
}

impl Default for PumpGeometry {
    fn default() -> Self {
        Self {
            position_count: 6,
            syringe_volume_ul: 5000,
            full_stroke_steps: 6000,
        }
    }
}

impl PumpGeometry {
    /// Convert a volume to plunger steps, rounding to the nearest step.
    pub fn volume_to_steps(&self, volume_ul: u32) -> u32 {
        if self.syringe_volume_ul == 0 {
            return 0;
        }
        let num = u64::from(volume_ul) * u64::from(self.full_stroke_steps);
        let den = u64::from(self.syringe_volume_ul);
        ((num + den / 2) / den) as u32
    }

    pub fn check_port(&self, position: u8) -> Result<()> {
        if position == 0 || position > self.position_count {
            return Err(HwError::InvalidPort {
                position,
                count: self.position_count,
            });
        }
        Ok(())
    }
}

/// Tracks how much liquid (or air) the syringe currently holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plunger {
    capacity_ul: u32,
    held_ul: u32,
}

impl Plunger {
    pub fn new(capacity_ul: u32) -> Self {
        Self {
            capacity_ul,
            held_ul: 0,
        }
    }

    pub fn held_ul(&self) -> u32 {
        self.held_ul
    }

    /// Validate a withdraw without applying it.
    pub fn check_draw(&self, volume_ul: u32) -> Result<()> {
        match self.held_ul.checked_add(volume_ul) {
            Some(total) if total <= self.capacity_ul => Ok(()),
            _ => Err(HwError::Capacity {
                held_ul: self.held_ul,
                requested_ul: volume_ul,
                capacity_ul: self.capacity_ul,
            }),
        }
    }

    /// Validate a dispense without applying it.
    pub fn check_expel(&self, volume_ul: u32) -> Result<()> {
        if volume_ul > self.held_ul {
            return Err(HwError::Underflow {
                held_ul: self.held_ul,
                requested_ul: volume_ul,
            });
        }
        Ok(())
    }

    pub fn draw(&mut self, volume_ul: u32) -> Result<()> {
        self.check_draw(volume_ul)?;
        self.held_ul += volume_ul;
        Ok(())
    }

    pub fn expel(&mut self, volume_ul: u32) -> Result<()> {
        self.check_expel(volume_ul)?;
        self.held_ul -= volume_ul;
        Ok(())
    }

    pub fn empty(&mut self) {
        self.held_ul = 0;
    }
}
