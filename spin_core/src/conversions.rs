//! `From` implementations bridging `spin_config` types to `spin_core` types.

use std::time::Duration;

use crate::config::{Agitation, Timing};
use crate::params::{PortMap, Recipes};

// ── PortMap ──────────────────────────────────────────────────────────────────

impl From<&spin_config::Ports> for PortMap {
    fn from(c: &spin_config::Ports) -> Self {
        Self {
            chamber: c.chamber,
            drain: c.drain,
            air: c.air,
            waste: c.waste,
            fluid_1: c.fluid_1,
            fluid_2: c.fluid_2,
        }
    }
}

// ── Agitation ────────────────────────────────────────────────────────────────

impl From<&spin_config::MotorCfg> for Agitation {
    fn from(c: &spin_config::MotorCfg) -> Self {
        Self {
            velocity: c.agitation_velocity,
            test_velocity: c.test_velocity,
        }
    }
}

// ── Timing ───────────────────────────────────────────────────────────────────

impl From<&spin_config::TimingCfg> for Timing {
    fn from(c: &spin_config::TimingCfg) -> Self {
        Self {
            self_test_dwell: Duration::from_millis(c.self_test_dwell_ms),
            prime_pause: Duration::from_millis(c.prime_pause_ms),
            purge_pause: Duration::from_millis(c.purge_pause_ms),
            pre_drain: Duration::from_millis(c.pre_drain_ms),
            interrupt_poll: Duration::from_millis(c.interrupt_poll_ms),
        }
    }
}

// ── Recipes ──────────────────────────────────────────────────────────────────

impl From<&spin_config::Config> for Recipes {
    fn from(c: &spin_config::Config) -> Self {
        Self {
            wash_volume_ml: c.wash.volume_ml,
            wash_count: c.wash.count,
            wash_minutes: c.wash.duration_min,
            clean_volume_ml: c.clean.volume_ml,
            clean_soak_minutes: c.clean.soak_min,
            fill_stroke_ul: c.pump.fill_stroke_ul,
            prime_stroke_ul: c.pump.prime_stroke_ul,
        }
    }
}
