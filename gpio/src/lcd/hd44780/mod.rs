//! HD44780 LCD module.
//!
//! The terminal uses a 16x2 HD44780-compatible panel wired in 4-bit mode with the R/W line tied
//! to write. There is no busy-flag polling; every transfer is followed by a fixed wait instead.

pub mod driver;
