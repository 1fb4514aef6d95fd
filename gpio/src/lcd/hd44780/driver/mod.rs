mod gpio;

use crate::{GpioError, GpioResult};
pub use gpio::*;
use std::fmt::Debug;

/// Low-level interface of an HD44780 controller.
///
/// Implementors only provide the transport ([Self::send_command], [Self::send_data]) and the
/// power-on sequence ([Self::init]). The instruction helpers below are built on top of them.
pub trait HD44780Driver: Debug {
    /// Brings the controller into 4-bit mode with the given line count and font, display on,
    /// cursor hidden, left-to-right entry, and an empty screen.
    fn init(&mut self, multiline: bool, alt_font: bool) -> GpioResult<()>;

    /// Clears the display and sets the cursor to the home position.
    fn clear_display(&mut self) -> GpioResult<()> {
        self.send_command(0b00000001)
    }

    /// Sets the display to the specified entry mode.
    fn set_entry_mode(&mut self, cursor_direction: CursorDirection, shift: bool) -> GpioResult<()> {
        let mut command = 0b00000100;
        if cursor_direction == CursorDirection::Right {
            command |= 0b00000010;
        }
        if shift {
            command |= 0b00000001;
        }
        self.send_command(command)
    }

    /// Sets the display on/off, cursor on/off, and blinking on/off.
    fn set_display_control(
        &mut self,
        display_on: bool,
        cursor_on: bool,
        blink_on: bool,
    ) -> GpioResult<()> {
        let mut command = 0b00001000;
        if display_on {
            command |= 0b00000100;
        }
        if cursor_on {
            command |= 0b00000010;
        }
        if blink_on {
            command |= 0b00000001;
        }
        self.send_command(command)
    }

    /// Function set: `data_length` selects the 8-bit interface, `two_lines` the 2-line layout
    /// and `font` the 5x10 font.
    fn function_set(&mut self, data_length: bool, two_lines: bool, font: bool) -> GpioResult<()> {
        let mut command = 0b00100000;
        if data_length {
            command |= 0b00010000;
        }
        if two_lines {
            command |= 0b00001000;
        }
        if font {
            command |= 0b00000100;
        }
        self.send_command(command)
    }

    /// Sets the DDRAM address, i.e. where the next character lands.
    ///
    /// In 2-line mode the first line starts at `0x00` and the second at `0x40`.
    fn set_ddram_address(&mut self, address: u8) -> GpioResult<()> {
        if address > 0b01111111 {
            return Err(GpioError::InvalidArgument);
        }
        self.send_command(0b10000000 | address)
    }

    /// Sends a command to the HD44780 controller (RS low).
    fn send_command(&mut self, command: u8) -> GpioResult<()>;

    /// Sends a character code to the HD44780 controller (RS high).
    fn send_data(&mut self, data: u8) -> GpioResult<()>;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CursorDirection {
    /// Moves the cursor to the left after writing data.
    Left,
    /// Moves the cursor to the right after writing data.
    Right,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{LcdOp, SimLcd};

    #[test]
    fn instruction_helpers_encode_commands() {
        let mut lcd = SimLcd::new();

        lcd.function_set(false, true, false).unwrap();
        lcd.set_display_control(true, false, false).unwrap();
        lcd.set_entry_mode(CursorDirection::Right, false).unwrap();
        lcd.set_entry_mode(CursorDirection::Left, true).unwrap();
        lcd.clear_display().unwrap();

        assert_eq!(
            lcd.ops(),
            vec![
                LcdOp::Command(0x28),
                LcdOp::Command(0x0C),
                LcdOp::Command(0x06),
                LcdOp::Command(0x05),
                LcdOp::Command(0x01),
            ]
        );
    }

    #[test]
    fn ddram_address_rows() {
        let mut lcd = SimLcd::new();

        lcd.set_ddram_address(0x03).unwrap();
        lcd.set_ddram_address(0x40).unwrap();

        assert_eq!(lcd.ops(), vec![LcdOp::Command(0x83), LcdOp::Command(0xC0)]);
    }

    #[test]
    fn ddram_address_out_of_range() {
        let mut lcd = SimLcd::new();

        assert_eq!(lcd.set_ddram_address(0x80), Err(GpioError::InvalidArgument));
        assert!(lcd.ops().is_empty());
    }
}
