//! Code entry on the keypad.

use log::debug;
use pinpad_gpio::GpioResult;
use pinpad_gpio::keypad::{Keypad, KeypadKey};
use pinpad_gpio::lcd::hd44780::driver::HD44780Driver;
use crate::access::Code;

/// Shown instead of each digit of a masked entry.
pub const MASK_CHAR: u8 = b'*';

/// Reads exactly `N` digits from the keypad, echoing each one at the LCD cursor.
///
/// Keys other than `0`-`9` are dropped without any feedback. With `mask` set, every digit is
/// echoed as [MASK_CHAR]. Blocks until all `N` digits have been typed.
pub fn read_code<const N: usize>(
    keypad: &dyn Keypad<Key = KeypadKey>,
    lcd: &mut dyn HD44780Driver,
    mask: bool,
) -> GpioResult<Code<N>> {
    let mut digits = [b'0'; N];

    for slot in digits.iter_mut() {
        let digit = loop {
            let key = keypad.scan()?;
            match key.to_digit() {
                Some(digit) => break b'0' + digit,
                None => debug!("Ignoring {:?} during code entry", key),
            }
        };

        *slot = digit;
        lcd.send_data(if mask { MASK_CHAR } else { digit })?;
    }

    Ok(Code(digits))
}
