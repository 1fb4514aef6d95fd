//! Simulated hardware for running the drivers off-target.
//!
//! Outputs and delays append to a shared [SimLog] instead of touching hardware, so a test can
//! check the exact sequence of levels and waits a driver produced. [SimMatrix] plays back a
//! scripted series of key presses, and [SimLcd] keeps a model of what the panel would show.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;
use crate::delay::Delay;
use crate::keypad::KeypadKey;
use crate::lcd::hd44780::driver::HD44780Driver;
use crate::{GpioBusInput, GpioBusOutput, GpioOutput, GpioResult};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SimEvent {
    /// A single output was driven.
    Pin(&'static str, bool),
    /// A bus was driven, bit 0 first.
    Bus(&'static str, Vec<bool>),
    /// A delay was requested.
    Sleep(Duration),
}

/// Shared, ordered journal of everything the simulated outputs saw.
#[derive(Clone, Debug, Default)]
pub struct SimLog(Rc<RefCell<Vec<SimEvent>>>);

impl SimLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: SimEvent) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.0.borrow().clone()
    }

    /// Only the requested delays, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.0
            .borrow()
            .iter()
            .filter_map(|event| match event {
                SimEvent::Sleep(duration) => Some(*duration),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct SimOutput {
    name: &'static str,
    log: SimLog,
}

impl SimOutput {
    pub fn new(name: &'static str, log: &SimLog) -> Self {
        SimOutput { name, log: log.clone() }
    }
}

impl GpioOutput for SimOutput {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.log.push(SimEvent::Pin(self.name, value));
        Ok(())
    }
}

#[derive(Debug)]
pub struct SimBusOutput<const N: usize> {
    name: &'static str,
    log: SimLog,
}

impl<const N: usize> SimBusOutput<N> {
    pub fn new(name: &'static str, log: &SimLog) -> Self {
        SimBusOutput { name, log: log.clone() }
    }
}

impl<const N: usize> GpioBusOutput<N> for SimBusOutput<N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        self.log.push(SimEvent::Bus(self.name, values.to_vec()));
        Ok(())
    }
}

/// Input bus whose levels are set by the test.
#[derive(Debug)]
pub struct SimBusInput<const N: usize> {
    levels: Cell<[bool; N]>,
}

impl<const N: usize> SimBusInput<N> {
    pub fn new(levels: [bool; N]) -> Self {
        SimBusInput { levels: Cell::new(levels) }
    }

    pub fn set(&self, levels: [bool; N]) {
        self.levels.set(levels);
    }
}

impl<const N: usize> GpioBusInput<N> for SimBusInput<N> {
    fn read(&self) -> GpioResult<[bool; N]> {
        Ok(self.levels.get())
    }
}

/// [Delay] that records the request and returns immediately.
#[derive(Debug)]
pub struct SimDelay {
    log: SimLog,
}

impl SimDelay {
    pub fn new(log: &SimLog) -> Self {
        SimDelay { log: log.clone() }
    }
}

impl Delay for SimDelay {
    fn sleep(&self, duration: Duration) {
        self.log.push(SimEvent::Sleep(duration));
    }
}

/// A 4x4 key matrix with pulled-up columns, pressed by a script.
///
/// Serves as both the row output bus and the column input bus of a keypad. Each scripted key
/// is held down while its row is selected for [Self::HOLD_READS] column reads, then released.
/// Reading the columns after the script has run out panics, since a real scan would block
/// forever at that point.
#[derive(Debug)]
pub struct SimMatrix {
    log: SimLog,
    presses: RefCell<VecDeque<(u8, u8)>>,
    selected_row: Cell<Option<u8>>,
    held: Cell<Option<(u8, u8, u32)>>,
}

impl SimMatrix {
    pub const HOLD_READS: u32 = 3;

    /// Scripts one press per character of `keys`, using the characters printed on the keypad.
    pub fn new(log: &SimLog, keys: &str) -> Self {
        let presses = keys
            .chars()
            .map(|c| {
                KeypadKey::from_char(c)
                    .unwrap_or_else(|| panic!("no key labelled {:?}", c))
                    .position()
            })
            .collect();

        SimMatrix {
            log: log.clone(),
            presses: RefCell::new(presses),
            selected_row: Cell::new(None),
            held: Cell::new(None),
        }
    }

    /// Presses that have not been picked up yet.
    pub fn remaining(&self) -> usize {
        self.presses.borrow().len() + self.held.get().map_or(0, |_| 1)
    }
}

impl GpioBusOutput<4> for SimMatrix {
    fn write(&self, values: &[bool; 4]) -> GpioResult<()> {
        self.log.push(SimEvent::Bus("rows", values.to_vec()));

        let mut low = values.iter().enumerate().filter(|&(_, &high)| !high);
        let selected = match (low.next(), low.next()) {
            (Some((row, _)), None) => Some(row as u8),
            _ => None,
        };
        self.selected_row.set(selected);
        Ok(())
    }
}

impl GpioBusInput<4> for SimMatrix {
    fn read(&self) -> GpioResult<[bool; 4]> {
        let (row, col, reads) = match self.held.get() {
            Some(held) => held,
            None => {
                let (row, col) = self
                    .presses
                    .borrow_mut()
                    .pop_front()
                    .unwrap_or_else(|| panic!("key script exhausted"));
                (row, col, Self::HOLD_READS)
            }
        };

        let mut levels = [true; 4];
        if self.selected_row.get() != Some(row) {
            self.held.set(Some((row, col, reads)));
        } else if reads > 0 {
            levels[col as usize] = false;
            self.held.set(Some((row, col, reads - 1)));
        } else {
            self.held.set(None);
        }
        Ok(levels)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LcdOp {
    Init { multiline: bool, alt_font: bool },
    Command(u8),
    Data(u8),
}

/// HD44780 stand-in that records instructions and models a 16x2 DDRAM.
#[derive(Debug, Default)]
pub struct SimLcd {
    ops: Vec<LcdOp>,
    ddram: Vec<(u8, u8)>,
    address: u8,
}

impl SimLcd {
    pub const COLUMNS: u8 = 16;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<LcdOp> {
        self.ops.clone()
    }

    /// Characters written since the last clear, in order.
    pub fn written(&self) -> String {
        self.ddram.iter().map(|&(_, byte)| byte as char).collect()
    }

    /// Both visible lines, trailing blanks trimmed.
    pub fn screen(&self) -> [String; 2] {
        [0x00, 0x40].map(|start| {
            let mut line = vec![' '; Self::COLUMNS as usize];
            for &(address, byte) in &self.ddram {
                if (start..start + Self::COLUMNS).contains(&address) {
                    line[(address - start) as usize] = byte as char;
                }
            }
            line.into_iter().collect::<String>().trim_end().to_string()
        })
    }
}

impl HD44780Driver for SimLcd {
    fn init(&mut self, multiline: bool, alt_font: bool) -> GpioResult<()> {
        self.ops.push(LcdOp::Init { multiline, alt_font });
        self.ddram.clear();
        self.address = 0;
        Ok(())
    }

    fn send_command(&mut self, command: u8) -> GpioResult<()> {
        self.ops.push(LcdOp::Command(command));
        if command == 0x01 {
            self.ddram.clear();
            self.address = 0;
        } else if command & 0x80 != 0 {
            self.address = command & 0x7F;
        }
        Ok(())
    }

    fn send_data(&mut self, data: u8) -> GpioResult<()> {
        self.ops.push(LcdOp::Data(data));
        self.ddram.retain(|&(address, _)| address != self.address);
        self.ddram.push((self.address, data));
        self.address = self.address.wrapping_add(1) & 0x7F;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_holds_then_releases() {
        let log = SimLog::new();
        let matrix = SimMatrix::new(&log, "5");
        let rows: &dyn GpioBusOutput<4> = &matrix;
        let cols: &dyn GpioBusInput<4> = &matrix;

        rows.write(&[false, true, true, true]).unwrap();
        assert_eq!(cols.read_nibble(), Ok(0b1111));

        rows.write(&[true, false, true, true]).unwrap();
        for _ in 0..SimMatrix::HOLD_READS {
            assert_eq!(cols.read_nibble(), Ok(0b1101));
        }
        assert_eq!(cols.read_nibble(), Ok(0b1111));
        assert_eq!(matrix.remaining(), 0);
    }

    #[test]
    fn lcd_screen_model() {
        let mut lcd = SimLcd::new();
        lcd.send_data(b'h').unwrap();
        lcd.send_command(0xC2).unwrap();
        lcd.send_data(b'i').unwrap();

        assert_eq!(lcd.screen(), ["h".to_string(), "  i".to_string()]);

        lcd.send_command(0x01).unwrap();
        assert_eq!(lcd.screen(), [String::new(), String::new()]);
        assert_eq!(lcd.written(), "");
    }

    #[test]
    fn lcd_init_resets_the_screen() {
        let mut lcd = SimLcd::new();
        lcd.send_data(b'x').unwrap();
        lcd.init(true, false).unwrap();
        lcd.send_data(b'y').unwrap();

        assert_eq!(
            lcd.ops(),
            vec![
                LcdOp::Data(b'x'),
                LcdOp::Init { multiline: true, alt_font: false },
                LcdOp::Data(b'y'),
            ]
        );
        assert_eq!(lcd.screen(), ["y".to_string(), String::new()]);
    }
}
