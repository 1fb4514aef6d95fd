mod gpio;

use std::fmt::Debug;
use crate::GpioResult;
pub use gpio::*;

/// The `Keypad` trait defines the interface for keypad input devices.
pub trait Keypad: Debug {
    type Key;

    /// Blocks until a key has been pressed and released again, and returns it.
    ///
    /// There is no timeout. A caller that has to stay responsive must not call this.
    fn scan(&self) -> GpioResult<Self::Key>;
}
