//! BCM pin numbers the terminal is wired to.

pub const LCD_E: usize = 17;
pub const LCD_RW: usize = 27;
pub const LCD_RS: usize = 22;
/// D4..D7, D4 being bit 0 of the bus.
pub const LCD_DATA: [usize; 4] = [26, 16, 20, 21];

/// Row 0 first. Driven low one at a time while scanning.
pub const KEYPAD_ROWS: [usize; 4] = [5, 6, 13, 19];
/// Column 0 first. Pulled up, read low under a pressed key.
pub const KEYPAD_COLS: [usize; 4] = [12, 7, 8, 25];
