//! The wash/clean cycle sequencer.
//!
//! Drives the pump and motor through a fixed order of operations per cycle
//! kind. Every device call is preceded by an interrupt check; once the flag
//! is raised no further pump or motor command is issued until
//! [`Sequencer::emergency_stop`].

use std::time::Duration;

use spin_traits::{Clock, DeviceError, Motor, MotorStatus, MonotonicClock, Operator, Pump};
use tracing::{debug, error, info, warn};

use crate::config::{Agitation, Timing};
use crate::error::{Device, Report, Result, SpinError, is_interrupt};
use crate::hw_error::map_hw_error;
use crate::params::{CycleKind, CycleParameters, PortMap, ValvePort};
use crate::timer::{Interrupt, Timer};

/// Identity read back from the pump at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpIdentity {
    pub address: u8,
    pub baud_rate: u32,
    pub firmware: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceReport {
    pub pump: PumpIdentity,
    pub motor: MotorStatus,
}

pub struct Sequencer<P, M, O> {
    pump: P,
    motor: M,
    operator: O,
    ports: PortMap,
    agitation: Agitation,
    timing: Timing,
    timer: Timer,
    agitating: bool,
}

impl<P: Pump, M: Motor, O: Operator> Sequencer<P, M, O> {
    pub fn new(pump: P, motor: M, operator: O, ports: PortMap) -> Self {
        let timing = Timing::default();
        Self {
            pump,
            motor,
            operator,
            ports,
            agitation: Agitation::default(),
            timer: Timer::new(
                Box::new(MonotonicClock::new()),
                Interrupt::new(),
                timing.interrupt_poll,
            ),
            timing,
            agitating: false,
        }
    }

    pub fn with_agitation(mut self, agitation: Agitation) -> Self {
        self.agitation = agitation;
        self
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self.timer = Timer::new(
            Box::new(MonotonicClock::new()),
            self.timer.interrupt().clone(),
            timing.interrupt_poll,
        );
        self
    }

    /// Replace the clock and interrupt flag used for every wait.
    pub fn with_clock(
        mut self,
        clock: Box<dyn Clock + Send + Sync>,
        interrupt: Interrupt,
    ) -> Self {
        self.timer = Timer::new(clock, interrupt, self.timing.interrupt_poll);
        self
    }

    pub fn interrupt(&self) -> &Interrupt {
        self.timer.interrupt()
    }

    pub fn pump(&self) -> &P {
        &self.pump
    }

    pub fn motor(&self) -> &M {
        &self.motor
    }

    pub fn operator(&self) -> &O {
        &self.operator
    }

    pub fn is_agitating(&self) -> bool {
        self.agitating
    }

    // ── guarded device access ───────────────────────────────────────────────

    fn lift<T>(&self, res: std::result::Result<T, DeviceError>, what: &str) -> Result<T> {
        res.map_err(|e| {
            if self.interrupt().is_triggered() {
                Report::new(SpinError::Interrupted)
            } else {
                Report::new(map_hw_error(e.as_ref()).during(what))
            }
        })
    }

    fn pump_op<T>(
        &mut self,
        what: &str,
        op: impl FnOnce(&mut P) -> std::result::Result<T, DeviceError>,
    ) -> Result<T> {
        self.interrupt().check()?;
        let res = op(&mut self.pump);
        self.lift(res, what)
    }

    fn motor_op<T>(
        &mut self,
        what: &str,
        op: impl FnOnce(&mut M) -> std::result::Result<T, DeviceError>,
    ) -> Result<T> {
        self.interrupt().check()?;
        let res = op(&mut self.motor);
        self.lift(res, what)
    }

    fn select(&mut self, port: ValvePort) -> Result<()> {
        let position = self.ports.position(port);
        debug!(%port, position, "select port");
        self.pump_op("select port", |p| p.select_port(position))
    }

    fn withdraw(&mut self, volume_ul: u32) -> Result<()> {
        self.pump_op("withdraw", |p| p.withdraw(volume_ul))
    }

    fn dispense(&mut self, volume_ul: u32) -> Result<()> {
        self.pump_op("dispense", |p| p.dispense(volume_ul))
    }

    fn reset_plunger(&mut self) -> Result<()> {
        self.pump_op("reset plunger", |p| p.reset_plunger())
    }

    fn pause(&self, d: Duration) -> Result<()> {
        self.timer.wait(d)
    }

    // ── operator ────────────────────────────────────────────────────────────

    pub fn say(&mut self, message: &str) {
        self.operator.say(message);
    }

    /// Ask the operator; `None` when input has closed.
    pub fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        self.interrupt().check()?;
        let res = self.operator.ask(prompt);
        res.map_err(|e| {
            if self.interrupt().is_triggered() {
                Report::new(SpinError::Interrupted)
            } else {
                Report::new(SpinError::Console(e.to_string()))
            }
        })
    }

    /// Blocking "press ENTER" gate. Closed input cannot acknowledge.
    fn acknowledge(&mut self, prompt: &str) -> Result<()> {
        match self.ask(prompt)? {
            Some(_) => Ok(()),
            None => Err(Report::new(SpinError::InputClosed)),
        }
    }

    // ── motor ───────────────────────────────────────────────────────────────

    fn start_agitation(&mut self) -> Result<()> {
        if self.agitating {
            return Ok(());
        }
        let v = self.agitation.velocity;
        self.motor_op("energize", |m| m.energize())?;
        self.motor_op("exit safe start", |m| m.exit_safe_start())?;
        self.motor_op("set velocity", |m| m.set_velocity(v))?;
        self.agitating = true;
        debug!(velocity = v, "agitation on");
        Ok(())
    }

    fn stop_agitation(&mut self) -> Result<()> {
        if !self.agitating {
            return Ok(());
        }
        self.motor_op("halt", |m| m.halt_and_hold())?;
        self.motor_op("deenergize", |m| m.deenergize())?;
        self.agitating = false;
        debug!("agitation off");
        Ok(())
    }

    /// Best-effort safety action after an interrupt: exactly one deenergize,
    /// errors logged and swallowed. The pump is left as it is.
    pub fn emergency_stop(&mut self) {
        warn!(target: "weblog", "interrupt received, deenergizing motor");
        if let Err(e) = self.motor.deenergize() {
            warn!(error = %e, "deenergize after interrupt failed");
        }
        self.agitating = false;
    }

    // ── initialization ──────────────────────────────────────────────────────

    /// Connect to both devices and self-test the motor. Any failure is fatal.
    pub fn initialize(&mut self) -> Result<DeviceReport> {
        info!(target: "weblog", "connecting to the multichannel syringe pump");
        let pump = self
            .init_pump()
            .map_err(|e| init_failure(Device::Pump, e))?;
        self.say(&format!("Address: {}", pump.address));
        self.say(&format!("Baud rate: {}", pump.baud_rate));
        self.say(&format!("Firmware version: {}", pump.firmware));
        info!(target: "weblog", "syringe pump is ready");

        info!(target: "weblog", "connecting to the stepper motor");
        let motor = self
            .init_motor()
            .map_err(|e| init_failure(Device::Motor, e))?;
        info!(target: "weblog", "motor is ready");

        Ok(DeviceReport { pump, motor })
    }

    fn init_pump(&mut self) -> Result<PumpIdentity> {
        let address = self.pump_op("query address", |p| p.address())?;
        let baud_rate = self.pump_op("query baud rate", |p| p.baud_rate())?;
        let firmware = self.pump_op("query firmware", |p| p.firmware_version())?;
        info!(target: "weblog", "initializing syringe");
        self.select(ValvePort::Waste)?;
        self.reset_plunger()?;
        Ok(PumpIdentity {
            address,
            baud_rate,
            firmware,
        })
    }

    fn init_motor(&mut self) -> Result<MotorStatus> {
        let status = self.motor_op("query status", |m| m.query_status())?;
        self.say(&format!("Tic board name: {}", status.name));
        self.say(&format!("Serial number: {}", status.serial));
        self.say(&format!("Firmware version: {}", status.firmware));
        self.say(&format!("VIN voltage: {:.1} V", status.supply_voltage));
        self.say(&format!("Energized: {}", status.energized));

        info!(target: "weblog", "testing motor");
        let v = self.agitation.test_velocity;
        let dwell = self.timing.self_test_dwell;
        self.motor_op("energize", |m| m.energize())?;
        self.motor_op("exit safe start", |m| m.exit_safe_start())?;
        self.motor_op("set velocity", |m| m.set_velocity(v))?;
        self.pause(dwell)?;
        self.motor_op("halt", |m| m.halt_and_hold())?;
        self.motor_op("set velocity", |m| m.set_velocity(-v))?;
        self.pause(dwell)?;
        self.motor_op("halt", |m| m.halt_and_hold())?;
        self.motor_op("deenergize", |m| m.deenergize())?;
        self.agitating = false;
        Ok(status)
    }

    // ── cycle building blocks ───────────────────────────────────────────────

    /// One stroke from the chamber drain line out to waste.
    fn drain_stroke(&mut self, stroke_ul: u32) -> Result<()> {
        self.select(ValvePort::Drain)?;
        self.withdraw(stroke_ul)?;
        self.select(ValvePort::Waste)?;
        self.dispense(stroke_ul)
    }

    /// Clear the fill line with air, then drain whatever stands in the chamber.
    fn preamble(&mut self, p: &CycleParameters) -> Result<()> {
        self.say("Purging fill line with air...");
        self.select(ValvePort::Air)?;
        self.withdraw(p.fill_stroke_ul)?;
        self.select(ValvePort::Chamber)?;
        self.reset_plunger()?;

        self.say("Draining any residuals in the chamber...");
        self.start_agitation()?;
        for _ in 0..p.num_fills() {
            self.drain_stroke(p.fill_stroke_ul)?;
        }
        Ok(())
    }

    /// Draw and return one prime stroke so the fluid line holds no air.
    fn prime(&mut self, p: &CycleParameters) -> Result<()> {
        let fluid = p.fluid_port();
        self.say(&format!("Priming {fluid} line..."));
        self.select(fluid)?;
        self.withdraw(p.prime_stroke_ul)?;
        self.pause(self.timing.prime_pause)?;
        self.dispense(p.prime_stroke_ul)?;
        self.pause(self.timing.prime_pause)
    }

    fn fill(&mut self, p: &CycleParameters) -> Result<()> {
        let fluid = p.fluid_port();
        let fills = p.num_fills();
        self.say("Filling the chamber...");
        debug!(fills, stroke_ul = p.fill_stroke_ul, "fill");
        for _ in 0..fills {
            self.withdraw(p.fill_stroke_ul)?;
            self.select(ValvePort::Chamber)?;
            self.dispense(p.fill_stroke_ul)?;
            self.select(fluid)?;
        }
        Ok(())
    }

    /// Push one stroke of air behind the last increment of liquid.
    fn finish_fill(&mut self, p: &CycleParameters) -> Result<()> {
        self.say("Purging fill line to finish fill...");
        self.select(ValvePort::Air)?;
        self.withdraw(p.fill_stroke_ul)?;
        self.select(ValvePort::Chamber)?;
        self.reset_plunger()?;
        self.pause(self.timing.purge_pause)
    }

    fn soak(&mut self, label: &str, d: Duration) -> Result<()> {
        self.say(&format!("{label} duration: {} seconds", d.as_secs()));
        let op = &mut self.operator;
        self.timer.wait_with(d, |remaining| op.progress(label, remaining))
    }

    fn drain(&mut self, p: &CycleParameters) -> Result<()> {
        let strokes = p.num_drains();
        info!(target: "weblog", strokes, "draining the chamber");
        self.start_agitation()?;
        self.pause(self.timing.pre_drain)?;
        for _ in 0..strokes {
            self.drain_stroke(p.fill_stroke_ul)?;
        }
        self.stop_agitation()?;
        info!(target: "weblog", "drain complete");
        Ok(())
    }

    // ── cycles ──────────────────────────────────────────────────────────────

    pub fn run_cycle(&mut self, p: &CycleParameters) -> Result<()> {
        match p.kind {
            CycleKind::Wash => self.run_wash(p),
            CycleKind::Clean => self.run_clean(p),
            CycleKind::Test => self.run_test(),
        }
    }

    pub fn run_wash(&mut self, p: &CycleParameters) -> Result<()> {
        let n = p.wash_count;
        info!(
            target: "weblog",
            washes = n,
            minutes = p.soak_minutes,
            volume_ml = p.volume_ml,
            fills = p.num_fills(),
            "wash cycle start"
        );
        self.preamble(p)?;

        self.stop_agitation()?;
        self.acknowledge(
            "Place the samples in the wash tray and place the wash tray in the basket. \
             Press ENTER to start the wash cycle",
        )?;

        for i in 1..=n {
            // The previous drain left the motor off.
            self.start_agitation()?;
            self.prime(p)?;
            self.fill(p)?;
            self.finish_fill(p)?;

            info!(target: "weblog", wash = i, of = n, minutes = p.soak_minutes, "wash started");
            self.say(&format!("Wash {i}/{n} started"));
            self.soak("Wash", p.soak())?;
            info!(target: "weblog", wash = i, of = n, "wash complete");
            self.say(&format!("Wash {i}/{n} complete"));

            if i == n {
                self.stop_agitation()?;
                self.acknowledge(
                    "Final wash complete. Remove sample tray and press ENTER to drain the chamber...",
                )?;
            }
            self.drain(p)?;
        }

        info!(target: "weblog", washes = n, "washes complete");
        self.say("Washes complete.");
        Ok(())
    }

    pub fn run_clean(&mut self, p: &CycleParameters) -> Result<()> {
        info!(
            target: "weblog",
            minutes = p.soak_minutes,
            volume_ml = p.volume_ml,
            fills = p.num_fills(),
            "clean cycle start"
        );
        self.preamble(p)?;
        self.prime(p)?;
        self.fill(p)?;
        self.finish_fill(p)?;

        self.stop_agitation()?;
        info!(target: "weblog", minutes = p.soak_minutes, "clean soak started");
        self.say("Clean soak started");
        self.soak("Clean", p.soak())?;
        info!(target: "weblog", "clean soak complete");
        self.say("Clean soak complete");

        self.drain(p)?;
        self.say("Clean complete.");
        Ok(())
    }

    /// Placeholder mode: touches no hardware.
    pub fn run_test(&mut self) -> Result<()> {
        info!(target: "weblog", "test cycle selected (not implemented)");
        self.say("Test cycle is not implemented yet.");
        Ok(())
    }
}

fn init_failure(device: Device, e: Report) -> Report {
    if is_interrupt(&e) {
        return e;
    }
    error!(target: "weblog", %device, error = %e, "could not connect");
    Report::new(SpinError::Init {
        device,
        reason: e.to_string(),
    })
}
