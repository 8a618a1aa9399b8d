#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! spindoctor: operator CLI for the hydrogel wash/clean apparatus.

mod app;
mod cli;
mod console;
mod error_fmt;
mod logging;

use clap::Parser;
use spin_core::SessionEnd;

use crate::cli::{Cli, JSON_MODE};
use crate::error_fmt::{EXIT_INTERRUPTED, exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if !cli.json {
        let _ = color_eyre::install();
    }

    let code = match app::run(&cli) {
        Ok(SessionEnd::Interrupted) => {
            tracing::warn!(target: "weblog", "run interrupted by operator");
            EXIT_INTERRUPTED
        }
        Ok(SessionEnd::Finished | SessionEnd::InputClosed) => 0,
        Err(e) => {
            tracing::error!(target: "weblog", error = %e, "fatal");
            tracing::debug!("{e:?}");
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            exit_code_for_error(&e)
        }
    };
    logging::flush();
    std::process::exit(code);
}
