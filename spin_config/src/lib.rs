#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the wash apparatus.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `[serial]`, `[ports]` and `[wash]` are required; every other section has
//!   defaults matching the bench hardware (6-port pump, 5 mL syringe).
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Serial {
    /// Serial device of the syringe pump (e.g. /dev/ttyUSB0 or COM3)
    pub port: String,
    #[serde(default = "default_baud")]
    pub baud_rate: u32,
    /// Pump bus address
    #[serde(default)]
    pub address: u8,
}

fn default_baud() -> u32 {
    9600
}

/// Physical valve position of each logical port (1-based).
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Ports {
    pub chamber: u8,
    pub drain: u8,
    pub air: u8,
    pub waste: u8,
    pub fluid_1: u8,
    pub fluid_2: u8,
}

impl Ports {
    fn named(&self) -> [(&'static str, u8); 6] {
        [
            ("chamber", self.chamber),
            ("drain", self.drain),
            ("air", self.air),
            ("waste", self.waste),
            ("fluid_1", self.fluid_1),
            ("fluid_2", self.fluid_2),
        ]
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PumpCfg {
    pub position_count: u8,
    pub syringe_volume_ul: u32,
    /// Motor steps for one full plunger stroke
    pub full_stroke_steps: u32,
    /// Volume moved per fill/drain stroke
    pub fill_stroke_ul: u32,
    /// Volume used to purge air from a fluid line before filling
    pub prime_stroke_ul: u32,
    /// Give up waiting for a pump motion after this long
    pub busy_timeout_ms: u64,
    /// Motor-status polling interval while a motion runs
    pub poll_ms: u64,
}

impl Default for PumpCfg {
    fn default() -> Self {
        Self {
            position_count: 6,
            syringe_volume_ul: 5000,
            full_stroke_steps: 6000,
            fill_stroke_ul: 5000,
            prime_stroke_ul: 1500,
            busy_timeout_ms: 30_000,
            poll_ms: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MotorCfg {
    /// Path or name of the ticcmd executable
    pub ticcmd: String,
    /// Controller serial number, when more than one Tic is attached
    pub device: Option<String>,
    /// Agitation speed during fill, soak and drain (microsteps per 10000 s)
    pub agitation_velocity: i32,
    /// Speed used by the start-up self-test, run forward then reverse
    pub test_velocity: i32,
}

impl Default for MotorCfg {
    fn default() -> Self {
        Self {
            ticcmd: "ticcmd".to_string(),
            device: None,
            agitation_velocity: 300_000,
            test_velocity: 400_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimingCfg {
    /// Hold time for each direction of the motor self-test
    pub self_test_dwell_ms: u64,
    /// Pause after each half of the prime stroke
    pub prime_pause_ms: u64,
    /// Pause after the finish-fill air purge
    pub purge_pause_ms: u64,
    /// Settle time before the drain strokes start
    pub pre_drain_ms: u64,
    /// Longest stretch a timed wait goes without checking for Ctrl-C
    pub interrupt_poll_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            self_test_dwell_ms: 3000,
            prime_pause_ms: 500,
            purge_pause_ms: 500,
            pre_drain_ms: 1000,
            interrupt_poll_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WashCfg {
    /// Chamber volume per wash, mL
    pub volume_ml: f64,
    /// Washes per single-shot cycle
    #[serde(default = "default_wash_count")]
    pub count: u32,
    /// Minutes per wash; prompted for when absent
    #[serde(default)]
    pub duration_min: Option<f64>,
}

fn default_wash_count() -> u32 {
    3
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CleanCfg {
    /// Chamber volume for the clean cycle, mL
    pub volume_ml: f64,
    /// Unagitated soak, minutes
    pub soak_min: f64,
}

impl Default for CleanCfg {
    fn default() -> Self {
        Self {
            volume_ml: 25.0,
            soak_min: 10.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines, weblog events only)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub serial: Serial,
    pub ports: Ports,
    #[serde(default)]
    pub pump: PumpCfg,
    #[serde(default)]
    pub motor: MotorCfg,
    #[serde(default)]
    pub timing: TimingCfg,
    pub wash: WashCfg,
    #[serde(default)]
    pub clean: CleanCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))?;
    cfg.validate()?;
    Ok(cfg)
}

const BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

/// Longest soak a cycle accepts (24 h).
pub const MAX_SOAK_MIN: f64 = 24.0 * 60.0;
/// Largest chamber volume a cycle accepts.
pub const MAX_VOLUME_ML: f64 = 10_000.0;

fn soak_minutes_ok(v: f64) -> bool {
    v.is_finite() && v > 0.0 && v <= MAX_SOAK_MIN
}

fn volume_ok(v: f64) -> bool {
    v.is_finite() && (0.0..=MAX_VOLUME_ML).contains(&v)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Serial
        if self.serial.port.trim().is_empty() {
            eyre::bail!("serial.port must not be empty");
        }
        if !BAUD_RATES.contains(&self.serial.baud_rate) {
            eyre::bail!(
                "serial.baud_rate must be one of {:?}, got {}",
                BAUD_RATES,
                self.serial.baud_rate
            );
        }

        // Pump
        let pump = &self.pump;
        if pump.syringe_volume_ul == 0 {
            eyre::bail!("pump.syringe_volume_ul must be > 0");
        }
        if pump.full_stroke_steps == 0 {
            eyre::bail!("pump.full_stroke_steps must be > 0");
        }
        if pump.fill_stroke_ul == 0 || pump.fill_stroke_ul > pump.syringe_volume_ul {
            eyre::bail!("pump.fill_stroke_ul must be in 1..=syringe_volume_ul");
        }
        if pump.prime_stroke_ul == 0 || pump.prime_stroke_ul > pump.syringe_volume_ul {
            eyre::bail!("pump.prime_stroke_ul must be in 1..=syringe_volume_ul");
        }
        if pump.busy_timeout_ms == 0 {
            eyre::bail!("pump.busy_timeout_ms must be >= 1");
        }
        if pump.poll_ms == 0 {
            eyre::bail!("pump.poll_ms must be >= 1");
        }

        // Ports: in range and no two logical ports on one valve position
        let named = self.ports.named();
        for (name, pos) in named {
            if pos == 0 || pos > pump.position_count {
                eyre::bail!(
                    "ports.{name} = {pos} is outside 1..={}",
                    pump.position_count
                );
            }
        }
        for (i, (a, pa)) in named.iter().enumerate() {
            if let Some((b, _)) = named[i + 1..].iter().find(|(_, pb)| pb == pa) {
                eyre::bail!("ports.{a} and ports.{b} both map to valve position {pa}");
            }
        }

        // Motor
        if self.motor.ticcmd.trim().is_empty() {
            eyre::bail!("motor.ticcmd must not be empty");
        }
        if self.motor.agitation_velocity == 0 {
            eyre::bail!("motor.agitation_velocity must be non-zero");
        }
        if self.motor.test_velocity == 0 {
            eyre::bail!("motor.test_velocity must be non-zero");
        }

        // Timing
        if self.timing.interrupt_poll_ms == 0 {
            eyre::bail!("timing.interrupt_poll_ms must be >= 1");
        }

        // Wash
        if !volume_ok(self.wash.volume_ml) {
            eyre::bail!("wash.volume_ml must be within 0..={MAX_VOLUME_ML}");
        }
        if self.wash.count == 0 {
            eyre::bail!("wash.count must be >= 1");
        }
        if let Some(min) = self.wash.duration_min
            && !soak_minutes_ok(min)
        {
            eyre::bail!("wash.duration_min must be > 0 and <= {MAX_SOAK_MIN}");
        }

        // Clean
        if !volume_ok(self.clean.volume_ml) {
            eyre::bail!("clean.volume_ml must be within 0..={MAX_VOLUME_ML}");
        }
        if !soak_minutes_ok(self.clean.soak_min) {
            eyre::bail!("clean.soak_min must be > 0 and <= {MAX_SOAK_MIN}");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot}");
        }

        Ok(())
    }
}
