//! Cycle parameters, logical valve ports and the volume arithmetic.

use std::fmt;
use std::time::Duration;

use crate::error::{BuildError, Report, Result};

pub const DEFAULT_FILL_STROKE_UL: u32 = 5000;
pub const DEFAULT_PRIME_STROKE_UL: u32 = 1500;
/// Extra drain strokes beyond the fill count, to clear residual liquid.
pub const DRAIN_MARGIN_STROKES: u32 = 3;
/// Longest soak a single cycle accepts (24 h).
pub const MAX_SOAK_MINUTES: f64 = 24.0 * 60.0;
/// Largest chamber volume a cycle accepts; keeps stroke counts far from `u32::MAX`.
pub const MAX_VOLUME_ML: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    Wash,
    Clean,
    Test,
}

impl fmt::Display for CycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CycleKind::Wash => "wash",
            CycleKind::Clean => "clean",
            CycleKind::Test => "test",
        })
    }
}

/// Logical valve ports; `PortMap` resolves them to physical positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValvePort {
    Chamber,
    Drain,
    Air,
    Waste,
    Fluid1,
    Fluid2,
}

impl fmt::Display for ValvePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValvePort::Chamber => "chamber",
            ValvePort::Drain => "drain",
            ValvePort::Air => "air",
            ValvePort::Waste => "waste",
            ValvePort::Fluid1 => "fluid 1",
            ValvePort::Fluid2 => "fluid 2",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMap {
    pub chamber: u8,
    pub drain: u8,
    pub air: u8,
    pub waste: u8,
    pub fluid_1: u8,
    pub fluid_2: u8,
}

impl PortMap {
    pub fn position(&self, port: ValvePort) -> u8 {
        match port {
            ValvePort::Chamber => self.chamber,
            ValvePort::Drain => self.drain,
            ValvePort::Air => self.air,
            ValvePort::Waste => self.waste,
            ValvePort::Fluid1 => self.fluid_1,
            ValvePort::Fluid2 => self.fluid_2,
        }
    }
}

impl Default for PortMap {
    fn default() -> Self {
        Self {
            chamber: 1,
            drain: 2,
            air: 3,
            waste: 4,
            fluid_1: 5,
            fluid_2: 6,
        }
    }
}

/// Whole fill strokes that fit in `volume_ml`; the remainder is not delivered.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn num_fills(volume_ml: f64, fill_stroke_ul: u32) -> u32 {
    if fill_stroke_ul == 0 {
        return 0;
    }
    // Resolve to whole microliters first so 0.3 mL / 100 uL is 3, not 2.
    let volume_ul = (volume_ml * 1000.0).round();
    // Float-to-int `as` saturates: negatives and NaN land on 0.
    (volume_ul / f64::from(fill_stroke_ul)).floor() as u32
}

/// Drain strokes always exceed fills by a fixed margin.
#[inline]
pub fn num_drains(num_fills: u32) -> u32 {
    num_fills.saturating_add(DRAIN_MARGIN_STROKES)
}

/// Soak durations the sequencer will run: positive, finite, at most a day.
pub fn valid_soak_minutes(minutes: f64) -> bool {
    minutes.is_finite() && minutes > 0.0 && minutes <= MAX_SOAK_MINUTES
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleParameters {
    pub kind: CycleKind,
    /// Washes per run; always 1 for clean.
    pub wash_count: u32,
    pub soak_minutes: f64,
    pub volume_ml: f64,
    pub fill_stroke_ul: u32,
    pub prime_stroke_ul: u32,
}

impl CycleParameters {
    pub fn builder(kind: CycleKind) -> CycleParametersBuilder {
        CycleParametersBuilder::new(kind)
    }

    pub fn num_fills(&self) -> u32 {
        num_fills(self.volume_ml, self.fill_stroke_ul)
    }

    pub fn num_drains(&self) -> u32 {
        num_drains(self.num_fills())
    }

    /// Soak length, clamped to `0..=MAX_SOAK_MINUTES`; NaN maps to zero.
    pub fn soak(&self) -> Duration {
        let minutes = self.soak_minutes.clamp(0.0, MAX_SOAK_MINUTES);
        Duration::try_from_secs_f64(minutes * 60.0).unwrap_or_default()
    }

    /// Fluid line feeding this cycle.
    pub fn fluid_port(&self) -> ValvePort {
        match self.kind {
            CycleKind::Clean => ValvePort::Fluid2,
            CycleKind::Wash | CycleKind::Test => ValvePort::Fluid1,
        }
    }
}

pub struct CycleParametersBuilder {
    kind: CycleKind,
    wash_count: Option<u32>,
    soak_minutes: Option<f64>,
    volume_ml: Option<f64>,
    fill_stroke_ul: u32,
    prime_stroke_ul: u32,
}

impl CycleParametersBuilder {
    pub fn new(kind: CycleKind) -> Self {
        Self {
            kind,
            wash_count: None,
            soak_minutes: None,
            volume_ml: None,
            fill_stroke_ul: DEFAULT_FILL_STROKE_UL,
            prime_stroke_ul: DEFAULT_PRIME_STROKE_UL,
        }
    }

    pub fn wash_count(mut self, n: u32) -> Self {
        self.wash_count = Some(n);
        self
    }

    pub fn soak_minutes(mut self, minutes: f64) -> Self {
        self.soak_minutes = Some(minutes);
        self
    }

    pub fn volume_ml(mut self, ml: f64) -> Self {
        self.volume_ml = Some(ml);
        self
    }

    pub fn fill_stroke_ul(mut self, ul: u32) -> Self {
        self.fill_stroke_ul = ul;
        self
    }

    pub fn prime_stroke_ul(mut self, ul: u32) -> Self {
        self.prime_stroke_ul = ul;
        self
    }

    pub fn build(self) -> Result<CycleParameters> {
        let invalid = |what| Report::new(BuildError::InvalidParameter(what));
        if self.fill_stroke_ul == 0 {
            return Err(invalid("fill stroke must be > 0 uL"));
        }
        if self.prime_stroke_ul == 0 {
            return Err(invalid("prime stroke must be > 0 uL"));
        }

        if self.kind == CycleKind::Test {
            return Ok(CycleParameters {
                kind: CycleKind::Test,
                wash_count: 0,
                soak_minutes: 0.0,
                volume_ml: 0.0,
                fill_stroke_ul: self.fill_stroke_ul,
                prime_stroke_ul: self.prime_stroke_ul,
            });
        }

        let wash_count = match (self.kind, self.wash_count) {
            (CycleKind::Wash, None) => return Err(Report::new(BuildError::MissingWashCount)),
            (CycleKind::Wash, Some(0)) => return Err(invalid("wash count must be >= 1")),
            (CycleKind::Wash, Some(n)) => n,
            (_, None | Some(1)) => 1,
            (_, Some(_)) => return Err(invalid("clean runs a single soak")),
        };
        let soak_minutes = self
            .soak_minutes
            .ok_or_else(|| Report::new(BuildError::MissingDuration))?;
        if !valid_soak_minutes(soak_minutes) {
            return Err(invalid("soak duration must be > 0 and <= 1440 minutes"));
        }
        let volume_ml = self
            .volume_ml
            .ok_or_else(|| Report::new(BuildError::MissingVolume))?;
        if !(volume_ml.is_finite() && (0.0..=MAX_VOLUME_ML).contains(&volume_ml)) {
            return Err(invalid("volume must be >= 0 and <= 10000 mL"));
        }

        Ok(CycleParameters {
            kind: self.kind,
            wash_count,
            soak_minutes,
            volume_ml,
            fill_stroke_ul: self.fill_stroke_ul,
            prime_stroke_ul: self.prime_stroke_ul,
        })
    }
}

/// Fixed per-installation inputs from which cycle parameters are built.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipes {
    pub wash_volume_ml: f64,
    /// Wash count used by the single-shot wash when none is given.
    pub wash_count: u32,
    /// Wash duration used by the single-shot wash when none is given.
    pub wash_minutes: Option<f64>,
    pub clean_volume_ml: f64,
    pub clean_soak_minutes: f64,
    pub fill_stroke_ul: u32,
    pub prime_stroke_ul: u32,
}

impl Default for Recipes {
    fn default() -> Self {
        Self {
            wash_volume_ml: 25.0,
            wash_count: 3,
            wash_minutes: None,
            clean_volume_ml: 25.0,
            clean_soak_minutes: 10.0,
            fill_stroke_ul: DEFAULT_FILL_STROKE_UL,
            prime_stroke_ul: DEFAULT_PRIME_STROKE_UL,
        }
    }
}

impl Recipes {
    pub fn wash(&self, count: u32, minutes: f64) -> Result<CycleParameters> {
        CycleParameters::builder(CycleKind::Wash)
            .wash_count(count)
            .soak_minutes(minutes)
            .volume_ml(self.wash_volume_ml)
            .fill_stroke_ul(self.fill_stroke_ul)
            .prime_stroke_ul(self.prime_stroke_ul)
            .build()
    }

    pub fn clean(&self) -> Result<CycleParameters> {
        CycleParameters::builder(CycleKind::Clean)
            .soak_minutes(self.clean_soak_minutes)
            .volume_ml(self.clean_volume_ml)
            .fill_stroke_ul(self.fill_stroke_ul)
            .prime_stroke_ul(self.prime_stroke_ul)
            .build()
    }
}
