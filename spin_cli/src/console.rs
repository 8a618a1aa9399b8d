//! Operator console over stdin/stdout.
//!
//! Stdin is read on a background thread so a pending prompt can still notice
//! Ctrl-C: `ask` waits on the line channel in `poll`-sized slices.

use std::io::{BufRead, Write};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use spin_core::Interrupt;
use spin_traits::{DeviceError, Operator};

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

pub struct StdinOperator {
    lines: Receiver<String>,
    interrupt: Interrupt,
    poll: Duration,
    progress_open: bool,
    spin: usize,
}

impl StdinOperator {
    /// Start the stdin reader thread. The channel closes at end of input.
    pub fn spawn(interrupt: Interrupt, poll: Duration) -> Self {
        let (tx, rx) = bounded(16);
        let reader = std::thread::Builder::new()
            .name("stdin".into())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            });
        if let Err(e) = reader {
            tracing::warn!(error = %e, "stdin reader thread failed to start");
        }
        Self::from_channel(rx, interrupt, poll)
    }

    pub fn from_channel(lines: Receiver<String>, interrupt: Interrupt, poll: Duration) -> Self {
        Self {
            lines,
            interrupt,
            poll: poll.max(Duration::from_millis(1)),
            progress_open: false,
            spin: 0,
        }
    }

    fn end_progress_line(&mut self) {
        if self.progress_open {
            println!();
            self.progress_open = false;
        }
    }
}

pub fn format_remaining(d: Duration) -> String {
    let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

impl Operator for StdinOperator {
    fn say(&mut self, message: &str) {
        self.end_progress_line();
        println!("{message}");
    }

    fn ask(&mut self, prompt: &str) -> Result<Option<String>, DeviceError> {
        self.end_progress_line();
        print!("{prompt}: ");
        std::io::stdout().flush()?;
        loop {
            match self.lines.recv_timeout(self.poll) {
                Ok(line) => return Ok(Some(line)),
                Err(RecvTimeoutError::Disconnected) => {
                    println!();
                    return Ok(None);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.interrupt.is_triggered() {
                        println!();
                        return Err("interrupted while waiting for input".into());
                    }
                }
            }
        }
    }

    fn progress(&mut self, label: &str, remaining: Duration) {
        let c = SPINNER[self.spin % SPINNER.len()];
        self.spin = self.spin.wrapping_add(1);
        print!("\r{c} {label}: {} remaining ", format_remaining(remaining));
        let _ = std::io::stdout().flush();
        self.progress_open = true;
    }
}
