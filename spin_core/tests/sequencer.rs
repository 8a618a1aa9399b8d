mod common;

use std::time::Duration;

use common::*;
use rstest::rstest;
use spin_core::{Device, Recipes, SessionEnd, SpinError, run_single};
use spin_hardware::{PumpGeometry, SimulatedMotor, SimulatedPump};

const CHAMBER: u8 = 1;
const DRAIN: u8 = 2;
const AIR: u8 = 3;
const WASTE: u8 = 4;
const FLUID_1: u8 = 5;
const FLUID_2: u8 = 6;

fn spin_error(e: &eyre::Report) -> &SpinError {
    e.downcast_ref::<SpinError>()
        .unwrap_or_else(|| panic!("not a SpinError: {e:?}"))
}

#[test]
fn initialize_queries_pump_then_self_tests_motor() {
    let log = new_log();
    let (mut seq, _) = spies(&log, &[]);
    let report = seq.initialize().unwrap();

    assert_eq!(report.pump.address, 1);
    assert_eq!(report.pump.firmware, "1.7");
    assert_eq!(report.motor.serial, "00286745");
    assert_eq!(
        device_calls(&log),
        vec![
            Call::Address,
            Call::Baud,
            Call::Firmware,
            Call::Select(WASTE),
            Call::Reset,
            Call::Status,
            Call::Energize,
            Call::ExitSafeStart,
            Call::Velocity(400_000),
            Call::Halt,
            Call::Velocity(-400_000),
            Call::Halt,
            Call::Deenergize,
        ]
    );
    assert_eq!(said(&log, "Baud rate: 9600"), 1);
    assert_eq!(said(&log, "VIN voltage: 12.1 V"), 1);
}

#[test]
fn self_test_dwells_in_each_direction() {
    let log = new_log();
    let irq = spin_core::Interrupt::new();
    let (mut seq, clock) = sequencer(
        SpyPump::new(&log),
        SpyMotor::new(&log),
        ScriptedOperator::new(&log, &[]),
        &irq,
    );
    seq.initialize().unwrap();
    assert_eq!(clock.elapsed(), Duration::from_secs(6));
}

#[test]
fn unreachable_pump_fails_initialization() {
    let log = new_log();
    let pump = SimulatedPump::new(PumpGeometry::default()).with_fault("no such port /dev/ttyUSB0");
    let mut seq = spin_core::Sequencer::new(
        pump,
        SimulatedMotor::new(),
        ScriptedOperator::new(&log, &[]),
        spin_core::PortMap::default(),
    );
    let err = seq.initialize().unwrap_err();
    match spin_error(&err) {
        SpinError::Init { device, reason } => {
            assert_eq!(*device, Device::Pump);
            assert!(reason.contains("/dev/ttyUSB0"), "{reason}");
        }
        other => panic!("expected Init, got {other:?}"),
    }
    assert!(!seq.motor().energized());
}

#[test]
fn missing_motor_fails_initialization_before_energizing() {
    let log = new_log();
    let irq = spin_core::Interrupt::new();
    let (mut seq, _) = sequencer(
        SpyPump::new(&log),
        SpyMotor::new(&log).unplugged(),
        ScriptedOperator::new(&log, &[]),
        &irq,
    );
    let err = seq.initialize().unwrap_err();
    assert!(matches!(
        spin_error(&err),
        SpinError::Init {
            device: Device::Motor,
            ..
        }
    ));
    assert_eq!(count(&log, &Call::Energize), 0);
}

#[test]
fn three_washes_gate_once_before_the_last_drain() {
    let log = new_log();
    let (mut seq, _) = spies(&log, &["", ""]);
    let params = Recipes::default().wash(3, 1.0).unwrap();
    assert_eq!(params.num_fills(), 5);

    run_single(&mut seq, &params).unwrap();

    // Preamble drains 5 strokes, each wash drains 5 + 3.
    assert_eq!(count(&log, &Call::Select(DRAIN)), 5 + 3 * 8);
    // Prime once per wash.
    assert_eq!(count(&log, &Call::Withdraw(1500)), 3);
    assert_eq!(said(&log, "complete"), 4);

    let removal = |c: &Call| matches!(c, Call::Ask(p) if p.contains("Remove sample tray"));
    let gates = log.borrow().iter().filter(|c| removal(c)).count();
    assert_eq!(gates, 1);

    let gate = position_of(&log, removal).unwrap();
    let third_done = position_of(&log, |c| *c == Call::Say("Wash 3/3 complete".into())).unwrap();
    assert!(third_done < gate);
    // Nothing drains between the third soak and the gate, and the motor is off.
    let between: Vec<Call> = log.borrow()[third_done..gate]
        .iter()
        .filter(|c| c.is_device())
        .cloned()
        .collect();
    assert_eq!(between, vec![Call::Halt, Call::Deenergize]);
    let after = log.borrow()[gate..]
        .iter()
        .filter(|c| c.is_device())
        .count();
    assert_eq!(after, 3 + 8 * 4 + 2); // energize trio, drain strokes, halt + deenergize
}

#[test]
fn tray_placement_gate_runs_with_the_motor_stopped() {
    let log = new_log();
    let (mut seq, _) = spies(&log, &["", ""]);
    run_single(&mut seq, &Recipes::default().wash(1, 0.5).unwrap()).unwrap();

    let gate = position_of(&log, |c| matches!(c, Call::Ask(p) if p.contains("Place the samples")))
        .unwrap();
    let before: Vec<Call> = log.borrow()[..gate]
        .iter()
        .filter(|c| c.is_motor())
        .cloned()
        .collect();
    assert_eq!(before.last(), Some(&Call::Deenergize));
    // Nothing has been primed before the samples are in.
    assert_eq!(
        position_of(&log, |c| *c == Call::Select(FLUID_1)).map(|i| i > gate),
        Some(true)
    );
}

#[test]
fn wash_gate_fails_when_input_closes() {
    let log = new_log();
    let (mut seq, _) = spies(&log, &[]);
    let err = run_single(&mut seq, &Recipes::default().wash(1, 0.5).unwrap()).unwrap_err();
    assert!(matches!(spin_error(&err), SpinError::InputClosed));
    assert!(!seq.is_agitating());
}

#[test]
fn clean_primes_fluid_two_and_soaks_unagitated() {
    let log = new_log();
    let irq = spin_core::Interrupt::new();
    let (mut seq, clock) = sequencer(
        SpyPump::new(&log),
        SpyMotor::new(&log),
        ScriptedOperator::new(&log, &[]),
        &irq,
    );
    run_single(&mut seq, &Recipes::default().clean().unwrap()).unwrap();

    assert_eq!(count(&log, &Call::Select(FLUID_1)), 0);
    // Prime plus one switch back per fill.
    assert_eq!(count(&log, &Call::Select(FLUID_2)), 1 + 5);
    assert!(!log.borrow().iter().any(|c| matches!(c, Call::Ask(_))));

    let soak = position_of(&log, |c| *c == Call::Say("Clean soak started".into())).unwrap();
    let calls = log.borrow();
    let last_motor_before = calls[..soak].iter().rev().find(|c| c.is_motor());
    assert_eq!(last_motor_before, Some(&Call::Deenergize));
    let first_device_after = calls[soak..].iter().find(|c| c.is_device());
    assert_eq!(first_device_after, Some(&Call::Energize));

    // Prime pauses, purge pause, pre-drain settle and the 10 minute soak.
    assert_eq!(clock.elapsed(), Duration::from_millis(500 + 500 + 500 + 1000 + 600_000));
}

#[test]
fn finish_fill_pushes_an_air_stroke_into_the_chamber() {
    let log = new_log();
    let (mut seq, _) = spies(&log, &[]);
    run_single(&mut seq, &Recipes::default().clean().unwrap()).unwrap();

    let calls = device_calls(&log);
    let purge = [
        Call::Select(AIR),
        Call::Withdraw(5000),
        Call::Select(CHAMBER),
        Call::Reset,
    ];
    // Once in the preamble, once after filling.
    let hits = calls.windows(4).filter(|w| *w == purge).count();
    assert_eq!(hits, 2);
}

#[rstest]
#[case(25.0, 5)]
#[case(24.9, 4)]
#[case(4.0, 0)]
fn fill_loop_runs_num_fills_times(#[case] volume_ml: f64, #[case] fills: usize) {
    let log = new_log();
    let (mut seq, _) = spies(&log, &[]);
    let recipes = Recipes {
        clean_volume_ml: volume_ml,
        clean_soak_minutes: 0.01,
        ..Recipes::default()
    };
    run_single(&mut seq, &recipes.clean().unwrap()).unwrap();

    let calls = device_calls(&log);
    let fill = [
        Call::Withdraw(5000),
        Call::Select(CHAMBER),
        Call::Dispense(5000),
        Call::Select(FLUID_2),
    ];
    assert_eq!(calls.windows(4).filter(|w| *w == fill).count(), fills);
    // Preamble drains, fills, then fills + 3 drains.
    assert_eq!(count(&log, &Call::Dispense(5000)), 3 * fills + 3);
    assert_eq!(count(&log, &Call::Select(WASTE)), 2 * fills + 3);
}

#[test]
fn interrupt_during_fill_stops_all_device_calls() {
    let log = new_log();
    let irq = spin_core::Interrupt::new();
    // Withdraws: air purge, 5 preamble drains, prime, then fills.
    let (mut seq, _) = sequencer(
        SpyPump::new(&log).interrupt_after_withdraw(9, &irq),
        SpyMotor::new(&log),
        ScriptedOperator::new(&log, &[]),
        &irq,
    );
    let end = run_single(&mut seq, &Recipes::default().clean().unwrap()).unwrap();
    assert_eq!(end, SessionEnd::Interrupted);

    let calls = device_calls(&log);
    let ninth = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, Call::Withdraw(_)))
        .nth(8)
        .map(|(i, _)| i)
        .unwrap();
    assert_eq!(calls[ninth + 1..].to_vec(), vec![Call::Deenergize]);
    assert!(!seq.is_agitating());
}

#[test]
fn interrupt_during_soak_ends_the_wait() {
    let log = new_log();
    let irq = spin_core::Interrupt::new();
    let (mut seq, clock) = sequencer(
        SpyPump::new(&log),
        SpyMotor::new(&log),
        ScriptedOperator::new(&log, &[]).interrupt_on_tick(3, &irq),
        &irq,
    );
    let end = run_single(&mut seq, &Recipes::default().clean().unwrap()).unwrap();
    assert_eq!(end, SessionEnd::Interrupted);

    let soak = position_of(&log, |c| *c == Call::Say("Clean soak started".into())).unwrap();
    let after: Vec<Call> = log.borrow()[soak..]
        .iter()
        .filter(|c| c.is_device())
        .cloned()
        .collect();
    assert_eq!(after, vec![Call::Deenergize]);
    assert!(clock.elapsed() < Duration::from_secs(10));
}

#[test]
fn pump_timeout_mid_cycle_is_fatal_without_cleanup() {
    let log = new_log();
    let irq = spin_core::Interrupt::new();
    let (mut seq, _) = sequencer(
        SpyPump::new(&log).fail_withdraw(8),
        SpyMotor::new(&log),
        ScriptedOperator::new(&log, &[]),
        &irq,
    );
    let err = run_single(&mut seq, &Recipes::default().clean().unwrap()).unwrap_err();
    assert!(matches!(spin_error(&err), SpinError::Timeout));

    let calls = device_calls(&log);
    assert_eq!(calls.last(), Some(&Call::Withdraw(5000)));
    assert_eq!(count(&log, &Call::Deenergize), 0);
}

#[test]
fn test_cycle_touches_no_hardware() {
    let log = new_log();
    let (mut seq, _) = spies(&log, &[]);
    seq.run_test().unwrap();
    assert!(device_calls(&log).is_empty());
    assert_eq!(said(&log, "not implemented"), 1);
}
