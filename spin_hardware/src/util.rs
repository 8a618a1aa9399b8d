use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Poll `is_done` until it reports true or `timeout` expires.
/// Sleeps `poll_interval` between polls to avoid hammering the bus.
pub fn poll_until(
    mut is_done: impl FnMut() -> Result<bool>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while !is_done()? {
        if Instant::now() >= deadline {
            return Err(HwError::BusyTimeout(timeout));
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}
