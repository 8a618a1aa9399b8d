//! Human-readable error descriptions, exit codes and structured JSON errors.

use spin_core::error::{BuildError, Device, SpinError};

pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_INIT: i32 = 3;
pub const EXIT_HARDWARE: i32 = 4;
pub const EXIT_INTERRUPTED: i32 = 130;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingWashCount => {
                "What happened: No wash count was given.\nLikely causes: Neither --count nor wash.count provided a value.\nHow to fix: Pass --count N or set wash.count in the config.".to_string()
            }
            BuildError::MissingDuration => {
                "What happened: No wash duration was given.\nLikely causes: --minutes was omitted and the prompt was not answered.\nHow to fix: Pass --minutes M or set wash.duration_min in the config.".to_string()
            }
            BuildError::MissingVolume => {
                "What happened: No chamber volume was given.\nLikely causes: The [wash] or [clean] volume is missing.\nHow to fix: Set wash.volume_ml and clean.volume_ml in the config.".to_string()
            }
            BuildError::InvalidParameter(msg) => format!(
                "What happened: Invalid cycle parameter ({msg}).\nLikely causes: A command-line override or config value is out of range.\nHow to fix: Correct the value and rerun."
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<SpinError>() {
        return match se {
            SpinError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing [serial], [ports] or [wash] sections, or out-of-range values in the TOML.\nHow to fix: Edit the config file (see etc/spindoctor.toml), then rerun."
            ),
            SpinError::Init {
                device: Device::Pump,
                reason,
            } => format!(
                "What happened: Could not connect to the syringe pump ({reason}).\nLikely causes: Wrong serial.port, pump powered off, or a baud rate/address mismatch.\nHow to fix: Check the USB-serial cable and power, then verify [serial] in the config."
            ),
            SpinError::Init {
                device: Device::Motor,
                reason,
            } => format!(
                "What happened: Could not connect to the stepper motor ({reason}).\nLikely causes: ticcmd not installed or not on PATH, Tic controller unplugged, or motor supply off.\nHow to fix: Run `ticcmd --status` by hand, then check motor.ticcmd and motor.device in the config."
            ),
            SpinError::Timeout => {
                "What happened: A device did not finish in time.\nLikely causes: Pump stalled or blocked line, or pump.busy_timeout_ms too low.\nHow to fix: Check tubing and valve for blockages; raise pump.busy_timeout_ms if moves are legitimately slow.".to_string()
            }
            SpinError::HardwareFault(msg) => format!(
                "What happened: The pump refused a command ({msg}).\nLikely causes: Plunger over- or under-travel, valve position outside the installed range, or a pump-side fault.\nHow to fix: Check [ports] and pump settings against the installed valve; reset the pump and rerun."
            ),
            SpinError::Hardware(msg) => format!(
                "What happened: Hardware communication failed ({msg}).\nLikely causes: Cable unplugged mid-cycle or device power lost.\nHow to fix: Check connections and power. The chamber may still hold liquid; drain it before the next run."
            ),
            SpinError::Interrupted => {
                "What happened: Run interrupted by the operator.\nLikely causes: Ctrl-C.\nHow to fix: The motor was deenergized; the chamber may still hold liquid.".to_string()
            }
            SpinError::InputClosed => {
                "What happened: Operator input closed while a confirmation was pending.\nLikely causes: stdin reached end of file (piped input ran out).\nHow to fix: Run interactively or supply an answer for every prompt.".to_string()
            }
            SpinError::Console(msg) => format!(
                "What happened: Operator console failed ({msg}).\nLikely causes: Terminal closed.\nHow to fix: Rerun from a terminal."
            ),
        };
    }

    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error class.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return EXIT_CONFIG;
    }
    match err.downcast_ref::<SpinError>() {
        Some(SpinError::Config(_)) => EXIT_CONFIG,
        Some(SpinError::Init { .. }) => EXIT_INIT,
        Some(SpinError::Hardware(_) | SpinError::HardwareFault(_) | SpinError::Timeout) => {
            EXIT_HARDWARE
        }
        Some(SpinError::Interrupted) => EXIT_INTERRUPTED,
        _ => EXIT_FAILURE,
    }
}

/// Stable machine-readable name of the error class.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidParameters";
    }
    match err.downcast_ref::<SpinError>() {
        Some(SpinError::Config(_)) => "Config",
        Some(SpinError::Init { .. }) => "Init",
        Some(SpinError::Hardware(_)) => "Hardware",
        Some(SpinError::HardwareFault(_)) => "HardwareFault",
        Some(SpinError::Timeout) => "Timeout",
        Some(SpinError::Interrupted) => "Interrupted",
        Some(SpinError::InputClosed) => "InputClosed",
        Some(SpinError::Console(_)) => "Console",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let mut obj = json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    });
    if let Some(SpinError::Init { device, .. }) = err.downcast_ref::<SpinError>() {
        obj["device"] = json!(device.to_string());
    }
    obj.to_string()
}
