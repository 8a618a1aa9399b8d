//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

/// Keeps the log file writer alive; taken and dropped by `logging::flush` before exit.
pub static FILE_GUARD: Mutex<Option<tracing_appender::non_blocking::WorkerGuard>> =
    Mutex::new(None);
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "spindoctor", version, about = "Hydrogel sample wash/clean sequencer")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/spindoctor.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); default: logging.level, else info
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute (default: interactive menu)
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq)]
pub enum Commands {
    /// Interactive menu: choose wash, clean or test until input closes
    Menu,
    /// Run one wash cycle and exit
    Wash {
        /// Number of washes (default: wash.count from the config)
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
        count: Option<u32>,
        /// Minutes per wash (default: wash.duration_min, else prompted)
        #[arg(long, value_name = "MIN")]
        minutes: Option<f64>,
    },
    /// Run one clean cycle and exit
    Clean,
    /// Connect to and self-test the devices, then exit
    SelfCheck,
}
