use std::fmt;

use thiserror::Error;

/// Which device an initialization failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Pump,
    Motor,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Pump => f.write_str("syringe pump"),
            Device::Motor => f.write_str("stepper motor"),
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum SpinError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for device")]
    Timeout,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{device} initialization failed: {reason}")]
    Init { device: Device, reason: String },
    #[error("interrupted by operator")]
    Interrupted,
    #[error("operator input closed")]
    InputClosed,
    #[error("operator console error: {0}")]
    Console(String),
}

impl SpinError {
    /// Prefix hardware messages with the operation that failed.
    pub fn during(self, what: &str) -> Self {
        match self {
            SpinError::Hardware(m) => SpinError::Hardware(format!("{what}: {m}")),
            SpinError::HardwareFault(m) => SpinError::HardwareFault(format!("{what}: {m}")),
            other => other,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("missing wash count")]
    MissingWashCount,
    #[error("missing soak duration")]
    MissingDuration,
    #[error("missing volume")]
    MissingVolume,
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

/// True when the report carries an operator interrupt.
pub fn is_interrupt(err: &Report) -> bool {
    matches!(err.downcast_ref::<SpinError>(), Some(SpinError::Interrupted))
}
