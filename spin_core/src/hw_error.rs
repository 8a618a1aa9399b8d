//! Maps `Box<dyn Error>` from trait boundaries to typed `SpinError`.
//!
//! The traits in `spin_traits` use `Box<dyn Error + Send + Sync>`; this module
//! converts those to our typed error enum, with an optional feature-gated path
//! for `spin_hardware::HwError` downcasting.

use crate::error::SpinError;

/// Map a trait-boundary error to a typed `SpinError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> SpinError {
    #[cfg(feature = "hardware-errors")]
    {
        use spin_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout | HwError::BusyTimeout(_) => SpinError::Timeout,
                HwError::PumpStatus { .. }
                | HwError::Capacity { .. }
                | HwError::Underflow { .. }
                | HwError::InvalidPort { .. } => SpinError::HardwareFault(hw.to_string()),
                other => SpinError::Hardware(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        SpinError::Timeout
    } else {
        SpinError::Hardware(s)
    }
}
