use std::ops::RangeBounds;
use log::warn;
use pinpad_gpio::{GpioError, GpioResult};
use pinpad_gpio::lcd::hd44780::driver::HD44780Driver;

pub trait WithinExt {
    fn within(&self, range: impl RangeBounds<Self>) -> bool;
}

impl <T: PartialOrd<T>> WithinExt for T {
    fn within(&self, range: impl RangeBounds<Self>) -> bool {
        range.contains(self)
    }
}

pub trait DisplayExt {
    /// Writes `s` at the cursor, one character code per char.
    fn print(&mut self, s: &str) -> GpioResult<()>;
    /// Moves the cursor to `col` on line `row` of the 2-line display.
    fn set_cursor(&mut self, row: usize, col: usize) -> GpioResult<()>;
}

impl <T: ?Sized + HD44780Driver> DisplayExt for T {
    fn print(&mut self, s: &str) -> GpioResult<()> {
        for c in s.chars() {
            if c.is_ascii() {
                self.send_data(c as u8)?;
            } else {
                warn!("Non-ASCII character: {}", c);
                self.send_data(b'?')?
            }
        }
        Ok(())
    }

    fn set_cursor(&mut self, row: usize, col: usize) -> GpioResult<()> {
        // Each line has 40 DDRAM cells, the second one starting at 0x40
        if !row.within(0..2) || !col.within(0..40) {
            return Err(GpioError::InvalidArgument);
        }
        self.set_ddram_address((col + 0x40 * row) as u8)
    }
}
