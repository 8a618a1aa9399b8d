#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Wash/clean cycle sequencing (hardware-agnostic).
//!
//! All hardware interactions go through the `spin_traits::Pump`,
//! `spin_traits::Motor` and `spin_traits::Operator` traits.
//!
//! ## Architecture
//!
//! - **Parameters**: cycle kinds, logical ports and fill/drain arithmetic (`params`)
//! - **Sequencer**: the fixed order of pump and motor operations per cycle (`sequencer`)
//! - **Menu**: cycle selection state machine (`menu`)
//! - **Timer**: deadline waits that observe the operator interrupt (`timer`)
//! - **Errors**: `SpinError` taxonomy and trait-boundary mapping (`error`, `hw_error`)

pub mod config;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod menu;
pub mod params;
pub mod sequencer;
pub mod timer;

pub use config::{Agitation, Timing};
pub use error::{BuildError, Device, Report, Result, SpinError, is_interrupt};
pub use menu::{MenuEvent, MenuState, Mode, SessionEnd, run_menu, run_single, run_single_wash};
pub use params::{
    CycleKind, CycleParameters, MAX_SOAK_MINUTES, MAX_VOLUME_ML, PortMap, Recipes, ValvePort,
    num_drains, num_fills, valid_soak_minutes,
};
pub use sequencer::{DeviceReport, PumpIdentity, Sequencer};
pub use timer::{Interrupt, Timer};
