//! Pololu Tic stepper controller driven through the `ticcmd` command-line tool.
//!
//! Every call spawns one `ticcmd` process and waits for it to exit.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use spin_traits::{DeviceError, Motor, MotorStatus};
use tracing::debug;

use crate::error::{HwError, Result};

pub struct TicCmdMotor {
    program: PathBuf,
    /// Optional `-d` device serial when several controllers are attached.
    device: Option<String>,
}

impl TicCmdMotor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            device: None,
        }
    }

    pub fn with_device(mut self, serial: impl Into<String>) -> Self {
        self.device = Some(serial.into());
        self
    }

    fn args(&self, flags: &[&str]) -> Vec<OsString> {
        let mut args = Vec::with_capacity(flags.len() + 2);
        if let Some(dev) = &self.device {
            args.push(OsString::from("-d"));
            args.push(OsString::from(dev));
        }
        args.extend(flags.iter().map(OsString::from));
        args
    }

    fn run(&self, flags: &[&str]) -> Result<Vec<u8>> {
        debug!(program = %self.program.display(), ?flags, "ticcmd");
        let output = Command::new(&self.program).args(self.args(flags)).output()?;
        if !output.status.success() {
            return Err(HwError::Command {
                args: flags.join(" "),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

/// Parse the report printed by `ticcmd -s --full`.
///
/// Only unindented `Key: value` lines are considered; nested blocks such as
/// the error list are skipped.
pub fn parse_status(text: &str) -> Result<MotorStatus> {
    let mut name = None;
    let mut serial = None;
    let mut firmware = None;
    let mut vin = None;
    let mut energized = None;

    for line in text.lines() {
        if line.starts_with(char::is_whitespace) {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Name" => name = Some(value.to_string()),
            "Serial number" => serial = Some(value.to_string()),
            "Firmware version" => firmware = Some(value.to_string()),
            "VIN voltage" => vin = Some(parse_voltage(value)?),
            "Energized" => energized = Some(parse_flag(value)?),
            _ => {}
        }
    }

    let missing = |field: &str| HwError::Status(format!("missing '{field}'"));
    Ok(MotorStatus {
        name: name.ok_or_else(|| missing("Name"))?,
        serial: serial.ok_or_else(|| missing("Serial number"))?,
        firmware: firmware.ok_or_else(|| missing("Firmware version"))?,
        supply_voltage: vin.ok_or_else(|| missing("VIN voltage"))?,
        energized: energized.ok_or_else(|| missing("Energized"))?,
    })
}

fn parse_voltage(value: &str) -> Result<f32> {
    value
        .split_whitespace()
        .next()
        .and_then(|v| v.parse::<f32>().ok())
        .ok_or_else(|| HwError::Status(format!("bad VIN voltage '{value}'")))
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "true" => Ok(true),
        "no" | "false" => Ok(false),
        _ => Err(HwError::Status(format!("bad Energized flag '{value}'"))),
    }
}

impl Motor for TicCmdMotor {
    fn query_status(&mut self) -> std::result::Result<MotorStatus, DeviceError> {
        let out = self.run(&["-s", "--full"])?;
        Ok(parse_status(&String::from_utf8_lossy(&out))?)
    }

    fn energize(&mut self) -> std::result::Result<(), DeviceError> {
        self.run(&["--energize"])?;
        Ok(())
    }

    fn deenergize(&mut self) -> std::result::Result<(), DeviceError> {
        self.run(&["--deenergize"])?;
        Ok(())
    }

    fn exit_safe_start(&mut self) -> std::result::Result<(), DeviceError> {
        self.run(&["--exit-safe-start"])?;
        Ok(())
    }

    fn set_velocity(&mut self, velocity: i32) -> std::result::Result<(), DeviceError> {
        let v = velocity.to_string();
        self.run(&["--velocity", &v])?;
        Ok(())
    }

    fn halt_and_hold(&mut self) -> std::result::Result<(), DeviceError> {
        self.run(&["--halt-and-hold"])?;
        Ok(())
    }
}
