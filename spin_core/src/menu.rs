//! Cycle selection state machine.
//!
//! `MenuState::transition` is pure; `run_menu` and `run_single` drive it
//! against a [`Sequencer`].

use spin_traits::{Motor, Operator, Pump};
use tracing::{info, warn};

use crate::error::{Result, is_interrupt};
use crate::params::{CycleParameters, Recipes, valid_soak_minutes};
use crate::sequencer::Sequencer;

pub const MENU_PROMPT: &str = "Select a cycle: [W]ash, [C]lean or [T]est";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    MenuPrompt,
    RunningWash,
    RunningClean,
    RunningTest,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEvent {
    /// First character of an operator answer at the menu prompt.
    Input(char),
    InputClosed,
    CycleFinished,
    Interrupted,
}

/// Where control goes after a cycle completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    SingleShot,
}

/// How a session ended without a hardware error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Finished,
    InputClosed,
    Interrupted,
}

impl MenuState {
    pub fn transition(self, event: MenuEvent, mode: Mode) -> MenuState {
        use MenuState::*;
        match (self, event) {
            (_, MenuEvent::Interrupted) => Exit,
            (MenuPrompt, MenuEvent::Input(c)) => match c.to_ascii_lowercase() {
                'w' => RunningWash,
                'c' => RunningClean,
                't' => RunningTest,
                _ => MenuPrompt,
            },
            (MenuPrompt, MenuEvent::InputClosed) => Exit,
            (RunningWash | RunningClean | RunningTest, MenuEvent::CycleFinished) => match mode {
                Mode::Interactive => MenuPrompt,
                Mode::SingleShot => Exit,
            },
            (state, _) => state,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self,
            MenuState::RunningWash | MenuState::RunningClean | MenuState::RunningTest
        )
    }
}

/// Ask until the answer parses and passes `accept`. `None` when input closes.
fn ask_number<T, P, M, O>(
    seq: &mut Sequencer<P, M, O>,
    prompt: &str,
    accept: impl Fn(&T) -> bool,
) -> Result<Option<T>>
where
    T: std::str::FromStr,
    P: Pump,
    M: Motor,
    O: Operator,
{
    loop {
        let Some(line) = seq.ask(prompt)? else {
            return Ok(None);
        };
        match line.trim().parse::<T>() {
            Ok(v) if accept(&v) => return Ok(Some(v)),
            _ => seq.say(&format!("Invalid input {:?}, try again.", line.trim())),
        }
    }
}

pub fn ask_wash_count<P: Pump, M: Motor, O: Operator>(
    seq: &mut Sequencer<P, M, O>,
) -> Result<Option<u32>> {
    ask_number(seq, "Enter the number of washes", |n: &u32| *n >= 1)
}

pub fn ask_wash_minutes<P: Pump, M: Motor, O: Operator>(
    seq: &mut Sequencer<P, M, O>,
) -> Result<Option<f64>> {
    ask_number(seq, "Enter the duration of each wash in minutes", |m: &f64| {
        valid_soak_minutes(*m)
    })
}

/// Turn an interrupt into a clean session end; anything else propagates.
fn settle<P: Pump, M: Motor, O: Operator>(
    seq: &mut Sequencer<P, M, O>,
    res: Result<SessionEnd>,
) -> Result<SessionEnd> {
    match res {
        Err(e) if is_interrupt(&e) => {
            seq.emergency_stop();
            Ok(SessionEnd::Interrupted)
        }
        other => other,
    }
}

pub fn run_menu<P: Pump, M: Motor, O: Operator>(
    seq: &mut Sequencer<P, M, O>,
    recipes: &Recipes,
    mode: Mode,
) -> Result<SessionEnd> {
    let res = menu_loop(seq, recipes, mode);
    settle(seq, res)
}

fn menu_loop<P: Pump, M: Motor, O: Operator>(
    seq: &mut Sequencer<P, M, O>,
    recipes: &Recipes,
    mode: Mode,
) -> Result<SessionEnd> {
    let mut state = MenuState::MenuPrompt;
    loop {
        let event = match state {
            MenuState::Exit => return Ok(SessionEnd::Finished),
            MenuState::MenuPrompt => match seq.ask(MENU_PROMPT)? {
                None => {
                    info!("operator input closed at menu");
                    MenuEvent::InputClosed
                }
                Some(line) => {
                    let c = line.trim().chars().next().unwrap_or(' ');
                    let next = state.transition(MenuEvent::Input(c), mode);
                    if next == MenuState::MenuPrompt {
                        warn!(input = %line.trim(), "invalid menu input");
                        seq.say("Invalid input, please enter W, C or T.");
                    }
                    MenuEvent::Input(c)
                }
            },
            MenuState::RunningWash => {
                let Some(count) = ask_wash_count(seq)? else {
                    return Ok(SessionEnd::InputClosed);
                };
                let Some(minutes) = ask_wash_minutes(seq)? else {
                    return Ok(SessionEnd::InputClosed);
                };
                seq.run_wash(&recipes.wash(count, minutes)?)?;
                MenuEvent::CycleFinished
            }
            MenuState::RunningClean => {
                seq.run_clean(&recipes.clean()?)?;
                MenuEvent::CycleFinished
            }
            MenuState::RunningTest => {
                seq.run_test()?;
                MenuEvent::CycleFinished
            }
        };
        if event == MenuEvent::InputClosed {
            return Ok(SessionEnd::InputClosed);
        }
        state = state.transition(event, mode);
    }
}

/// Run one prepared cycle and exit.
pub fn run_single<P: Pump, M: Motor, O: Operator>(
    seq: &mut Sequencer<P, M, O>,
    params: &CycleParameters,
) -> Result<SessionEnd> {
    let res = seq.run_cycle(params).map(|()| SessionEnd::Finished);
    settle(seq, res)
}

/// Single-shot wash. Falls back to the recipe count, and asks for the
/// duration when neither the caller nor the recipe has one.
pub fn run_single_wash<P: Pump, M: Motor, O: Operator>(
    seq: &mut Sequencer<P, M, O>,
    recipes: &Recipes,
    count: Option<u32>,
    minutes: Option<f64>,
) -> Result<SessionEnd> {
    let res = single_wash(seq, recipes, count, minutes);
    settle(seq, res)
}

fn single_wash<P: Pump, M: Motor, O: Operator>(
    seq: &mut Sequencer<P, M, O>,
    recipes: &Recipes,
    count: Option<u32>,
    minutes: Option<f64>,
) -> Result<SessionEnd> {
    let count = count.unwrap_or(recipes.wash_count);
    let minutes = match minutes.or(recipes.wash_minutes) {
        Some(m) => m,
        None => match ask_wash_minutes(seq)? {
            Some(m) => m,
            None => return Ok(SessionEnd::InputClosed),
        },
    };
    seq.run_wash(&recipes.wash(count, minutes)?)?;
    Ok(SessionEnd::Finished)
}
