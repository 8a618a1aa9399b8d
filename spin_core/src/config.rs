//! Runtime configuration for the sequencer.
//!
//! These are separate from the TOML-deserialized config in `spin_config`.

use std::time::Duration;

/// Stepper speeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Agitation {
    /// Speed held during fill, soak and drain.
    pub velocity: i32,
    /// Speed of the start-up self-test, run forward then reverse.
    pub test_velocity: i32,
}

impl Default for Agitation {
    fn default() -> Self {
        Self {
            velocity: 300_000,
            test_velocity: 400_000,
        }
    }
}

/// Fixed dwells between hardware steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub self_test_dwell: Duration,
    pub prime_pause: Duration,
    pub purge_pause: Duration,
    pub pre_drain: Duration,
    /// Upper bound on how long a wait goes without checking for an interrupt.
    pub interrupt_poll: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            self_test_dwell: Duration::from_secs(3),
            prime_pause: Duration::from_millis(500),
            purge_pause: Duration::from_millis(500),
            pre_drain: Duration::from_secs(1),
            interrupt_poll: Duration::from_millis(100),
        }
    }
}
