#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::error::Error;
use std::rc::Rc;
use std::time::Duration;

use spin_core::{Interrupt, PortMap, Sequencer};
use spin_hardware::error::HwError;
use spin_traits::clock::test_clock::TestClock;
use spin_traits::{Motor, MotorStatus, Operator, Pump};

type DevResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Everything the sequencer asked of the outside world, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Select(u8),
    Withdraw(u32),
    Dispense(u32),
    Reset,
    Address,
    Baud,
    Firmware,
    Status,
    Energize,
    Deenergize,
    ExitSafeStart,
    Velocity(i32),
    Halt,
    Say(String),
    Ask(String),
}

impl Call {
    pub fn is_pump(&self) -> bool {
        matches!(
            self,
            Call::Select(_)
                | Call::Withdraw(_)
                | Call::Dispense(_)
                | Call::Reset
                | Call::Address
                | Call::Baud
                | Call::Firmware
        )
    }

    pub fn is_motor(&self) -> bool {
        matches!(
            self,
            Call::Status
                | Call::Energize
                | Call::Deenergize
                | Call::ExitSafeStart
                | Call::Velocity(_)
                | Call::Halt
        )
    }

    pub fn is_device(&self) -> bool {
        self.is_pump() || self.is_motor()
    }
}

pub type Log = Rc<RefCell<Vec<Call>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub struct SpyPump {
    log: Log,
    withdraws: usize,
    interrupt_after: Option<(usize, Interrupt)>,
    fail_withdraw: Option<usize>,
}

impl SpyPump {
    pub fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            withdraws: 0,
            interrupt_after: None,
            fail_withdraw: None,
        }
    }

    /// Raise `irq` as the `n`th withdraw completes (1-based).
    pub fn interrupt_after_withdraw(mut self, n: usize, irq: &Interrupt) -> Self {
        self.interrupt_after = Some((n, irq.clone()));
        self
    }

    /// The `n`th withdraw (1-based) times out.
    pub fn fail_withdraw(mut self, n: usize) -> Self {
        self.fail_withdraw = Some(n);
        self
    }

    fn record(&self, c: Call) {
        self.log.borrow_mut().push(c);
    }
}

impl Pump for SpyPump {
    fn select_port(&mut self, position: u8) -> DevResult<()> {
        self.record(Call::Select(position));
        Ok(())
    }

    fn withdraw(&mut self, volume_ul: u32) -> DevResult<()> {
        self.record(Call::Withdraw(volume_ul));
        self.withdraws += 1;
        if self.fail_withdraw == Some(self.withdraws) {
            return Err(Box::new(HwError::BusyTimeout(Duration::from_secs(30))));
        }
        if let Some((n, irq)) = &self.interrupt_after
            && *n == self.withdraws
        {
            irq.trigger();
        }
        Ok(())
    }

    fn dispense(&mut self, volume_ul: u32) -> DevResult<()> {
        self.record(Call::Dispense(volume_ul));
        Ok(())
    }

    fn reset_plunger(&mut self) -> DevResult<()> {
        self.record(Call::Reset);
        Ok(())
    }

    fn address(&mut self) -> DevResult<u8> {
        self.record(Call::Address);
        Ok(1)
    }

    fn baud_rate(&mut self) -> DevResult<u32> {
        self.record(Call::Baud);
        Ok(9600)
    }

    fn firmware_version(&mut self) -> DevResult<String> {
        self.record(Call::Firmware);
        Ok("1.7".to_string())
    }
}

pub struct SpyMotor {
    log: Log,
    status_fails: bool,
}

impl SpyMotor {
    pub fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            status_fails: false,
        }
    }

    /// `query_status` fails as if `ticcmd` could not find the controller.
    pub fn unplugged(mut self) -> Self {
        self.status_fails = true;
        self
    }

    fn record(&self, c: Call) {
        self.log.borrow_mut().push(c);
    }
}

impl Motor for SpyMotor {
    fn query_status(&mut self) -> DevResult<MotorStatus> {
        self.record(Call::Status);
        if self.status_fails {
            return Err(Box::new(HwError::Command {
                args: "-s --full".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "No Tic devices found".to_string(),
            }));
        }
        Ok(MotorStatus {
            name: "Tic T825 Stepper Motor Controller".to_string(),
            serial: "00286745".to_string(),
            firmware: "1.06".to_string(),
            supply_voltage: 12.1,
            energized: false,
        })
    }

    fn energize(&mut self) -> DevResult<()> {
        self.record(Call::Energize);
        Ok(())
    }

    fn deenergize(&mut self) -> DevResult<()> {
        self.record(Call::Deenergize);
        Ok(())
    }

    fn exit_safe_start(&mut self) -> DevResult<()> {
        self.record(Call::ExitSafeStart);
        Ok(())
    }

    fn set_velocity(&mut self, velocity: i32) -> DevResult<()> {
        self.record(Call::Velocity(velocity));
        Ok(())
    }

    fn halt_and_hold(&mut self) -> DevResult<()> {
        self.record(Call::Halt);
        Ok(())
    }
}

/// Operator that answers from a script; closes input once the script runs out.
pub struct ScriptedOperator {
    log: Log,
    answers: VecDeque<String>,
    interrupt_on_progress: Option<(usize, Interrupt)>,
    ticks: usize,
}

impl ScriptedOperator {
    pub fn new(log: &Log, answers: &[&str]) -> Self {
        Self {
            log: log.clone(),
            answers: answers.iter().map(|s| s.to_string()).collect(),
            interrupt_on_progress: None,
            ticks: 0,
        }
    }

    /// Raise `irq` on the `n`th progress tick (1-based).
    pub fn interrupt_on_tick(mut self, n: usize, irq: &Interrupt) -> Self {
        self.interrupt_on_progress = Some((n, irq.clone()));
        self
    }
}

impl Operator for ScriptedOperator {
    fn say(&mut self, message: &str) {
        self.log.borrow_mut().push(Call::Say(message.to_string()));
    }

    fn ask(&mut self, prompt: &str) -> DevResult<Option<String>> {
        self.log.borrow_mut().push(Call::Ask(prompt.to_string()));
        Ok(self.answers.pop_front())
    }

    fn progress(&mut self, _label: &str, _remaining: Duration) {
        self.ticks += 1;
        if let Some((n, irq)) = &self.interrupt_on_progress
            && *n == self.ticks
        {
            irq.trigger();
        }
    }
}

pub type SpySequencer = Sequencer<SpyPump, SpyMotor, ScriptedOperator>;

/// Sequencer over spies with a virtual clock and the default port map
/// (chamber 1, drain 2, air 3, waste 4, fluid 1 on 5, fluid 2 on 6).
pub fn sequencer(
    pump: SpyPump,
    motor: SpyMotor,
    operator: ScriptedOperator,
    irq: &Interrupt,
) -> (SpySequencer, TestClock) {
    let clock = TestClock::new();
    let seq = Sequencer::new(pump, motor, operator, PortMap::default())
        .with_clock(Box::new(clock.clone()), irq.clone());
    (seq, clock)
}

pub fn spies(log: &Log, answers: &[&str]) -> (SpySequencer, Interrupt) {
    let irq = Interrupt::new();
    let (seq, _) = sequencer(
        SpyPump::new(log),
        SpyMotor::new(log),
        ScriptedOperator::new(log, answers),
        &irq,
    );
    (seq, irq)
}

pub fn device_calls(log: &Log) -> Vec<Call> {
    log.borrow().iter().filter(|c| c.is_device()).cloned().collect()
}

pub fn count(log: &Log, want: &Call) -> usize {
    log.borrow().iter().filter(|c| *c == want).count()
}

pub fn said(log: &Log, needle: &str) -> usize {
    log.borrow()
        .iter()
        .filter(|c| matches!(c, Call::Say(m) if m.contains(needle)))
        .count()
}

pub fn position_of(log: &Log, pred: impl Fn(&Call) -> bool) -> Option<usize> {
    log.borrow().iter().position(pred)
}
