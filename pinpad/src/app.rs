//! The module for the main app state and logic.

use log::{debug, info, warn};
use pinpad_gpio::GpioResult;
use pinpad_gpio::delay::Delay;
use pinpad_gpio::keypad::{Keypad, KeypadKey};
use pinpad_gpio::lcd::hd44780::driver::HD44780Driver;
use crate::access::{check_access, AccessDecision, Code, CODE_LEN};
use crate::input::read_code;
use crate::utils::DisplayExt;

/// The main app state struct.
pub struct App<'a> {
    /// The current state of the app.
    state: AppState,
    /// The LCD driver for the app.
    lcd: &'a mut dyn HD44780Driver,
    /// The keypad codes are typed on.
    keypad: &'a dyn Keypad<Key = KeypadKey>,
    delay: &'a dyn Delay,
}

impl<'a> App<'a> {
    /// How long the verdict stays on screen before the next ID prompt.
    pub const RESULT_DWELL_MS: u64 = 2000;

    /// Creates a new instance of the App, starting at the ID prompt.
    pub fn new(
        lcd: &'a mut dyn HD44780Driver,
        keypad: &'a dyn Keypad<Key = KeypadKey>,
        delay: &'a dyn Delay,
    ) -> App<'a> {
        App {
            state: AppState::default(),
            lcd,
            keypad,
            delay,
        }
    }

    /// Runs the terminal forever. Only returns if the hardware fails.
    pub fn run(&mut self) -> GpioResult<()> {
        loop {
            let decision = self.cycle()?;
            debug!("Cycle finished: {:?}.", decision);
        }
    }

    /// Runs states until a verdict has been shown, and returns it.
    pub fn cycle(&mut self) -> GpioResult<AccessDecision> {
        loop {
            let state = self.state;
            self.step()?;
            if let AppState::ShowResult { decision } = state {
                return Ok(decision);
            }
        }
    }

    /// Draws the current state, does whatever input or waiting it needs and moves to the next.
    pub fn step(&mut self) -> GpioResult<()> {
        self.state.draw(self.lcd)?;

        self.state = match self.state {
            AppState::PromptId => {
                let id = read_code(self.keypad, self.lcd, false)?;
                debug!("ID {} entered.", id);
                AppState::PromptPassword { id }
            }
            AppState::PromptPassword { id } => {
                let password: Code<CODE_LEN> = read_code(self.keypad, self.lcd, true)?;
                let decision = check_access(id.value(), password.value());
                match decision {
                    AccessDecision::Granted => info!("Access granted for ID {}.", id),
                    AccessDecision::Denied => warn!("Access denied for ID {}.", id),
                }
                AppState::ShowResult { decision }
            }
            AppState::ShowResult { .. } => {
                self.delay.sleep_ms(Self::RESULT_DWELL_MS);
                AppState::PromptId
            }
        };

        Ok(())
    }
}

/// Enum that can represent the different states of the application.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum AppState {
    /// Waiting for the ID to be typed.
    #[default]
    PromptId,
    /// Waiting for the password, masked on screen.
    PromptPassword {
        /// The ID typed in the previous state.
        id: Code<CODE_LEN>,
    },
    /// Showing the verdict.
    ShowResult {
        decision: AccessDecision,
    },
}

impl AppState {
    /// Draws the current state of the application on the provided LCD driver.
    ///
    /// Prompts leave the cursor at the start of the second line, where the entry is echoed.
    fn draw(&self, lcd: &mut dyn HD44780Driver) -> GpioResult<()> {
        lcd.clear_display()?;
        lcd.set_cursor(0, 0)?;
        match self {
            AppState::PromptId => {
                lcd.print("Enter ID:")?;
                lcd.set_cursor(1, 0)?;
            }
            AppState::PromptPassword { .. } => {
                lcd.print("Enter Pass:")?;
                lcd.set_cursor(1, 0)?;
            }
            AppState::ShowResult { decision } => {
                lcd.print(decision.message())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinpad_gpio::keypad::GpioKeypad;
    use pinpad_gpio::sim::{LcdOp, SimDelay, SimLcd, SimLog, SimMatrix};
    use std::time::Duration;

    /// Splits the LCD traffic into screens at every clear, keeping only the characters.
    fn screens(ops: &[LcdOp]) -> Vec<String> {
        let mut screens = Vec::new();
        for op in ops {
            match op {
                LcdOp::Command(0x01) => screens.push(String::new()),
                LcdOp::Data(byte) => {
                    if let Some(screen) = screens.last_mut() {
                        screen.push(*byte as char);
                    }
                }
                _ => {}
            }
        }
        screens
    }

    /// Runs `cycles` full cycles with `keys` scripted on the keypad.
    fn run_cycles(keys: &str, cycles: usize) -> (Vec<AccessDecision>, SimLcd, SimLog) {
        let log = SimLog::new();
        let matrix = SimMatrix::new(&log, keys);
        let delay = SimDelay::new(&log);
        let keypad = GpioKeypad::new(&matrix, &matrix, &delay);
        let mut lcd = SimLcd::new();

        let decisions = {
            let mut app = App::new(&mut lcd, &keypad, &delay);
            let decisions = (0..cycles).map(|_| app.cycle().unwrap()).collect();
            assert_eq!(app.state, AppState::PromptId);
            decisions
        };

        assert_eq!(matrix.remaining(), 0);
        (decisions, lcd, log)
    }

    #[test]
    fn matching_id_in_range_is_granted() {
        let (decisions, lcd, _) = run_cycles("23352335", 1);

        assert_eq!(decisions, vec![AccessDecision::Granted]);
        assert_eq!(
            screens(&lcd.ops()),
            vec!["Enter ID:2335", "Enter Pass:****", "Access Granted"]
        );
    }

    #[test]
    fn mismatched_password_is_denied() {
        let (decisions, lcd, _) = run_cycles("23352336", 1);

        assert_eq!(decisions, vec![AccessDecision::Denied]);
        assert_eq!(lcd.screen()[0], "Access Denied");
    }

    #[test]
    fn out_of_range_id_is_denied() {
        let (decisions, _, _) = run_cycles("10001000", 1);

        assert_eq!(decisions, vec![AccessDecision::Denied]);
    }

    #[test]
    fn loops_back_to_the_id_prompt() {
        let (decisions, lcd, _) = run_cycles("2330+2330A2340=2341", 2);

        assert_eq!(decisions, vec![AccessDecision::Granted, AccessDecision::Denied]);
        assert_eq!(
            screens(&lcd.ops()),
            vec![
                "Enter ID:2330",
                "Enter Pass:****",
                "Access Granted",
                "Enter ID:2340",
                "Enter Pass:****",
                "Access Denied",
            ]
        );
    }

    #[test]
    fn prompts_echo_on_the_second_line() {
        let log = SimLog::new();
        let matrix = SimMatrix::new(&log, "2338");
        let delay = SimDelay::new(&log);
        let keypad = GpioKeypad::new(&matrix, &matrix, &delay);
        let mut lcd = SimLcd::new();

        {
            let mut app = App::new(&mut lcd, &keypad, &delay);
            app.step().unwrap();
            assert_eq!(app.state, AppState::PromptPassword { id: Code(*b"2338") });
        }

        assert_eq!(lcd.screen(), ["Enter ID:".to_string(), "2338".to_string()]);
    }

    #[test]
    fn verdict_dwells_for_two_seconds() {
        let (_, _, log) = run_cycles("23352335", 1);

        assert_eq!(log.sleeps().last(), Some(&Duration::from_millis(2000)));
    }
}
