//! Session wiring: config to devices to sequencer to the chosen command.

use eyre::Result;
use spin_config::Config;
use spin_core::{
    Agitation, Interrupt, Mode, PortMap, Recipes, SessionEnd, Sequencer, SpinError, Timing,
    is_interrupt, run_menu, run_single, run_single_wash,
};
use spin_hardware::PumpGeometry;
use spin_traits::{MonotonicClock, Motor, Pump};
use tracing::{info, warn};

use crate::cli::{Cli, Commands};
use crate::console::StdinOperator;
use crate::logging;

/// Load config, install tracing, then run the session.
pub fn run(cli: &Cli) -> Result<SessionEnd> {
    let loaded = spin_config::load_file(&cli.config);
    logging::init_tracing(
        cli.json,
        cli.log_level.as_deref(),
        loaded.as_ref().ok().map(|c| &c.logging),
    );
    let cfg = loaded.map_err(|e| eyre::Report::new(SpinError::Config(e.to_string())))?;
    info!(config = %cli.config.display(), "configuration loaded");

    let interrupt = Interrupt::new();
    {
        let irq = interrupt.clone();
        if let Err(e) = ctrlc::set_handler(move || irq.trigger()) {
            warn!(error = %e, "Ctrl-C handler not installed");
        }
    }

    let pump = open_pump(&cfg)?;
    let motor = open_motor(&cfg);
    run_session(pump, motor, cli, &cfg, interrupt)
}

fn geometry(cfg: &Config) -> PumpGeometry {
    PumpGeometry {
        position_count: cfg.pump.position_count,
        syringe_volume_ul: cfg.pump.syringe_volume_ul,
        full_stroke_steps: cfg.pump.full_stroke_steps,
    }
}

#[cfg(all(feature = "hardware", unix))]
fn open_pump(cfg: &Config) -> Result<impl Pump> {
    use std::path::Path;
    use std::time::Duration;

    let port = spin_hardware::serial::open(Path::new(&cfg.serial.port), cfg.serial.baud_rate)
        .map_err(|e| {
            eyre::Report::new(SpinError::Init {
                device: spin_core::Device::Pump,
                reason: e.to_string(),
            })
        })?;
    let timing = spin_hardware::LinkTiming {
        busy_timeout: Duration::from_millis(cfg.pump.busy_timeout_ms),
        poll_interval: Duration::from_millis(cfg.pump.poll_ms),
    };
    Ok(spin_hardware::RunzePump::new(
        port,
        cfg.serial.address,
        geometry(cfg),
        timing,
    ))
}

#[cfg(all(feature = "hardware", unix))]
fn open_motor(cfg: &Config) -> impl Motor {
    let tic = spin_hardware::TicCmdMotor::new(&cfg.motor.ticcmd);
    match &cfg.motor.device {
        Some(serial) => tic.with_device(serial),
        None => tic,
    }
}

#[cfg(not(all(feature = "hardware", unix)))]
fn open_pump(cfg: &Config) -> Result<impl Pump> {
    let pump = spin_hardware::SimulatedPump::new(geometry(cfg));
    if std::env::var("SPIN_TEST_SIM_PUMP_FAIL").as_deref() == Ok("1") {
        return Ok(pump.with_fault(format!("no pump on {}", cfg.serial.port)));
    }
    Ok(pump)
}

#[cfg(not(all(feature = "hardware", unix)))]
fn open_motor(_cfg: &Config) -> impl Motor {
    spin_hardware::SimulatedMotor::new()
}

fn run_session<P: Pump, M: Motor>(
    pump: P,
    motor: M,
    cli: &Cli,
    cfg: &Config,
    interrupt: Interrupt,
) -> Result<SessionEnd> {
    let timing = Timing::from(&cfg.timing);
    let operator = StdinOperator::spawn(interrupt.clone(), timing.interrupt_poll);
    let mut seq = Sequencer::new(pump, motor, operator, PortMap::from(&cfg.ports))
        .with_agitation(Agitation::from(&cfg.motor))
        .with_timing(timing)
        .with_clock(Box::new(MonotonicClock::new()), interrupt);
    let recipes = Recipes::from(cfg);

    match seq.initialize() {
        Ok(_) => {}
        Err(e) if is_interrupt(&e) => {
            seq.emergency_stop();
            return Ok(SessionEnd::Interrupted);
        }
        Err(e) => return Err(e),
    }

    match cli.cmd.unwrap_or(Commands::Menu) {
        Commands::Menu => run_menu(&mut seq, &recipes, Mode::Interactive),
        Commands::Wash { count, minutes } => run_single_wash(&mut seq, &recipes, count, minutes),
        Commands::Clean => run_single(&mut seq, &recipes.clean()?),
        Commands::SelfCheck => {
            seq.say("Self-check passed.");
            Ok(SessionEnd::Finished)
        }
    }
}
