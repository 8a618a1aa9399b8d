//! Deadline timer with cooperative cancellation.
//!
//! Waits are sliced into `poll`-sized sleeps so a Ctrl-C raised on another
//! thread ends the wait within one slice.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use spin_traits::Clock;

use crate::error::{BuildError, Report, Result, SpinError};

const TICK: Duration = Duration::from_secs(1);

/// Shared operator-interrupt flag.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_triggered() {
            return Err(Report::new(SpinError::Interrupted));
        }
        Ok(())
    }
}

pub struct Timer {
    clock: Box<dyn Clock + Send + Sync>,
    interrupt: Interrupt,
    poll: Duration,
}

impl Timer {
    pub fn new(clock: Box<dyn Clock + Send + Sync>, interrupt: Interrupt, poll: Duration) -> Self {
        Self {
            clock,
            interrupt,
            poll: poll.max(Duration::from_millis(1)),
        }
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Block for `d` unless interrupted.
    pub fn wait(&self, d: Duration) -> Result<()> {
        self.wait_with(d, |_| {})
    }

    /// Block for `d`, reporting the remaining time about once per second.
    pub fn wait_with(&self, d: Duration, mut on_tick: impl FnMut(Duration)) -> Result<()> {
        let start = self.clock.now();
        let Some(deadline) = start.checked_add(d) else {
            return Err(Report::new(BuildError::InvalidParameter(
                "wait exceeds the clock range",
            )));
        };
        let mut next_tick = start;
        loop {
            self.interrupt.check()?;
            let now = self.clock.now();
            if now >= deadline {
                return Ok(());
            }
            if now >= next_tick {
                on_tick(deadline - now);
                next_tick = now.checked_add(TICK).unwrap_or(deadline);
            }
            self.clock.sleep(self.clock.remaining(deadline).min(self.poll));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_interrupt;
    use spin_traits::clock::test_clock::TestClock;

    fn timer(clock: &TestClock, interrupt: &Interrupt) -> Timer {
        Timer::new(
            Box::new(clock.clone()),
            interrupt.clone(),
            Duration::from_millis(100),
        )
    }

    #[test]
    fn waits_the_full_duration() {
        let clock = TestClock::new();
        let t = timer(&clock, &Interrupt::new());
        t.wait(Duration::from_secs(90)).unwrap();
        assert_eq!(clock.elapsed(), Duration::from_secs(90));
    }

    #[test]
    fn zero_wait_returns_immediately() {
        let clock = TestClock::new();
        let t = timer(&clock, &Interrupt::new());
        t.wait(Duration::ZERO).unwrap();
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn ticks_roughly_once_per_second() {
        let clock = TestClock::new();
        let t = timer(&clock, &Interrupt::new());
        let mut ticks = Vec::new();
        t.wait_with(Duration::from_secs(5), |rem| ticks.push(rem))
            .unwrap();
        assert_eq!(ticks.len(), 5);
        assert_eq!(ticks[0], Duration::from_secs(5));
        assert_eq!(ticks[4], Duration::from_secs(1));
    }

    #[test]
    fn unrepresentable_deadline_is_an_error() {
        let clock = TestClock::new();
        let err = timer(&clock, &Interrupt::new())
            .wait(Duration::MAX)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::InvalidParameter(_))
        ));
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn pending_interrupt_refuses_to_wait() {
        let clock = TestClock::new();
        let irq = Interrupt::new();
        irq.trigger();
        let err = timer(&clock, &irq).wait(Duration::from_secs(1)).unwrap_err();
        assert!(is_interrupt(&err));
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn interrupt_mid_wait_ends_within_one_slice() {
        let clock = TestClock::new();
        let irq = Interrupt::new();
        let t = timer(&clock, &irq);
        let err = t
            .wait_with(Duration::from_secs(600), |rem| {
                if rem <= Duration::from_secs(598) {
                    irq.trigger();
                }
            })
            .unwrap_err();
        assert!(is_interrupt(&err));
        assert!(clock.elapsed() <= Duration::from_millis(2100));
    }
}
