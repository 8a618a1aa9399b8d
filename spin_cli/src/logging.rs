//! Tracing setup: console layer plus an optional JSON-lines file for `weblog` events.

use std::path::Path;

use spin_config::Logging;
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

use crate::cli::FILE_GUARD;

/// Target carrying phase transitions destined for remote delivery.
pub const WEBLOG: &str = "weblog";

/// Console filter: `RUST_LOG` wins, then `--log-level`, then `logging.level`.
fn console_filter(cli_level: Option<&str>, cfg: Option<&Logging>) -> EnvFilter {
    if let Ok(f) = EnvFilter::try_from_default_env() {
        return f;
    }
    let level = cli_level
        .or_else(|| cfg.and_then(|l| l.level.as_deref()))
        .unwrap_or("info");
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn file_writer(
    path: &Path,
    rotation: Option<&str>,
) -> tracing_appender::rolling::RollingFileAppender {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "spindoctor.log".to_string());
    match rotation {
        Some("daily") => tracing_appender::rolling::daily(dir, name),
        Some("hourly") => tracing_appender::rolling::hourly(dir, name),
        _ => tracing_appender::rolling::never(dir, name),
    }
}

/// Install the global subscriber. Console output goes to stderr so the
/// operator dialogue on stdout stays readable.
pub fn init_tracing(json: bool, cli_level: Option<&str>, cfg: Option<&Logging>) {
    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter(cli_level, cfg))
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(console_filter(cli_level, cfg))
            .boxed()
    };

    let file = cfg.and_then(|l| l.file.as_deref()).map(|path| {
        let appender = file_writer(Path::new(path), cfg.and_then(|l| l.rotation.as_deref()));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        if let Ok(mut slot) = FILE_GUARD.lock() {
            *slot = Some(guard);
        }
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(Targets::new().with_target(WEBLOG, Level::INFO))
            .boxed()
    });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
}

/// Flush and close the log file. `process::exit` runs no destructors.
pub fn flush() {
    if let Ok(mut slot) = FILE_GUARD.lock() {
        drop(slot.take());
    }
}
