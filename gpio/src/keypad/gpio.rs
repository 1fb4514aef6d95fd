use std::fmt::{Debug, Formatter};
use std::hint::spin_loop;
use log::{debug, trace};
use crate::delay::Delay;
use crate::{GpioBusInput, GpioBusOutput, GpioResult};
use crate::keypad::Keypad;

/// Represents the keys on the 4x4 calculator-style keypad.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum KeypadKey {
    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    /// The `/` key.
    KeyDivide,
    /// The `*` key.
    KeyMultiply,
    /// The `-` key.
    KeyMinus,
    /// The `+` key.
    KeyPlus,
    /// The `=` key.
    KeyEquals,
    /// The `A` key, bottom left.
    KeyA,
}

use KeypadKey::*;

/// Key layout, indexed by `[row][column]`.
const KEYS: [[KeypadKey; 4]; 4] = [
    [ Key7, Key8, Key9, KeyDivide, ],
    [ Key4, Key5, Key6, KeyMultiply, ],
    [ Key1, Key2, Key3, KeyMinus, ],
    [ KeyA, Key0, KeyEquals, KeyPlus, ],
];

impl KeypadKey {
    /// Converts a position tuple (row, column) to a [KeypadKey].
    pub fn from_position(pos: (u8, u8)) -> Option<KeypadKey> {
        if pos.0 < 4 && pos.1 < 4 {
            Some(KEYS[pos.0 as usize][pos.1 as usize])
        } else {
            None
        }
    }

    /// Gets the (row, column) of the key in the matrix.
    pub fn position(self) -> (u8, u8) {
        (0..4u8)
            .flat_map(|row| (0..4u8).map(move |col| (row, col)))
            .find(|&(row, col)| KEYS[row as usize][col as usize] == self)
            .unwrap_or_else(|| unreachable!("every key is in the layout"))
    }

    /// Converts the [KeypadKey] to the character printed on it.
    pub fn to_char(self) -> char {
        match self {
            Key0 => '0',
            Key1 => '1',
            Key2 => '2',
            Key3 => '3',
            Key4 => '4',
            Key5 => '5',
            Key6 => '6',
            Key7 => '7',
            Key8 => '8',
            Key9 => '9',
            KeyDivide => '/',
            KeyMultiply => '*',
            KeyMinus => '-',
            KeyPlus => '+',
            KeyEquals => '=',
            KeyA => 'A',
        }
    }

    /// Finds the key with the given character printed on it.
    pub fn from_char(c: char) -> Option<KeypadKey> {
        KEYS.iter().flatten().copied().find(|key| key.to_char() == c)
    }

    /// Gets the digit value for the number keys, `None` for the rest.
    pub fn to_digit(self) -> Option<u8> {
        self.to_char().to_digit(10).map(|d| d as u8)
    }
}

/// The `GpioKeypad` struct represents a GPIO-based 4x4 matrix keypad.
///
/// Rows are outputs and columns are pulled-up inputs. A row is selected by driving it low, and a
/// pressed key in that row pulls its column low.
pub struct GpioKeypad<'a> {
    rows: &'a dyn GpioBusOutput<4>,
    cols: &'a dyn GpioBusInput<4>,
    delay: &'a dyn Delay,
}

impl Debug for GpioKeypad<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpioKeypad({:?}, {:?})", self.rows, self.cols)
    }
}

impl<'a> GpioKeypad<'a> {
    /// Time between selecting a row and sampling the columns.
    pub const SETTLE_US: u64 = 5;
    /// Time a detected press is left alone before waiting for its release.
    pub const DEBOUNCE_MS: u64 = 20;

    /// Creates a new `GpioKeypad` from the row output bus and the column input bus.
    ///
    /// The column bus is expected to have pull-ups enabled.
    pub fn new(
        rows: &'a dyn GpioBusOutput<4>,
        cols: &'a dyn GpioBusInput<4>,
        delay: &'a dyn Delay,
    ) -> Self {
        GpioKeypad { rows, cols, delay }
    }

    /// Bus levels selecting `row`: that line low, the other three high.
    fn row_strobe(row: u8) -> u8 {
        !(1u8 << row) & 0x0F
    }
}

impl Keypad for GpioKeypad<'_> {
    type Key = KeypadKey;

    fn scan(&self) -> GpioResult<Self::Key> {
        loop {
            for row in 0..4u8 {
                self.rows.write_nibble(Self::row_strobe(row))?;
                self.delay.sleep_us(Self::SETTLE_US);

                let cols = self.cols.read_nibble()?;
                let Some(col) = (0..4u8).find(|&col| cols & (1u8 << col) == 0) else {
                    continue;
                };
                trace!("Column {} low on row {}", col, row);

                self.delay.sleep_ms(Self::DEBOUNCE_MS);
                // Only the column that fired is watched for the release
                while self.cols.read_nibble()? & (1u8 << col) == 0 {
                    spin_loop();
                }

                let key = KEYS[row as usize][col as usize];
                debug!("Key {:?} ({}) released", key, key.to_char());
                return Ok(key);
            }
        }
    }
}
