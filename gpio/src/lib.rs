//! GPIO access and the two devices hanging off it: an HD44780 character LCD on a 4-bit bus and a
//! 4x4 matrix keypad.
//!
//! Drivers are written against the traits in this module, so the same code runs on the
//! memory-mapped backend ([raw]), the character-device backend ([gpiod]) and, in tests, the
//! simulated one (`sim`).

pub mod delay;
pub mod gpiod;
pub mod keypad;
pub mod lcd;
pub mod raw;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

/// A source of GPIO lines. Hands out single pins and fixed-width buses, each index at most once.
pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO pins available.
    fn count(&self) -> GpioResult<usize>;

    /// Claims the GPIO pin at the given index.
    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>>;

    /// Claims the GPIO pins at the given indices as one bus, first index being bit 0.
    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>>;
}

/// Specifies the bias of a GPIO line.
///
/// The keypad columns rely on [GpioBias::PullUp] so that an idle column reads high.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioBias {
    #[default] None,
    PullUp,
    PullDown,
}

/// A single claimed line. Single lines are only ever driven; inputs are read as a [GpioBus].
pub trait GpioPin: Debug {
    /// Sets the GPIO pin function to output, allowing writing its state.
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>>;

    /// Gets the bias of the GPIO pin.
    fn bias(&self) -> GpioBias {
        GpioBias::None
    }
    /// Sets the bias of the GPIO pin.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the backend cannot bias its lines.
    fn set_bias(&mut self, _bias: GpioBias) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
}

pub trait GpioOutput: Debug {
    /// Drives the GPIO pin high (`true`) or low (`false`).
    fn write(&self, value: bool) -> GpioResult<()>;
}

pub trait GpioBus<const N: usize>: Debug {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>>;
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>>;

    fn bias(&self) -> GpioBias {
        GpioBias::None
    }
    fn set_bias(&mut self, _bias: GpioBias) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
}

pub trait GpioBusInput<const N: usize>: Debug {
    fn read(&self) -> GpioResult<[bool; N]>;
}

impl dyn GpioBusInput<4> + '_ {
    /// Reads the levels of the bus as a nibble, LSb first.
    pub fn read_nibble(&self) -> GpioResult<u8> {
        let values = self.read()?;
        Ok(values
            .iter()
            .enumerate()
            .filter(|&(_, &high)| high)
            .fold(0u8, |nibble, (i, _)| nibble | 1u8 << i))
    }
}

pub trait GpioBusOutput<const N: usize>: Debug {
    fn write(&self, values: &[bool; N]) -> GpioResult<()>;
}

impl dyn GpioBusOutput<4> + '_ {
    /// Drives the bus with a nibble, LSb first.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if `value` does not fit in 4 bits.
    pub fn write_nibble(&self, value: u8) -> GpioResult<()> {
        if value > 0b1111 {
            return Err(GpioError::InvalidArgument);
        }

        self.write(&std::array::from_fn(|i| value & (1u8 << i) != 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimBusInput, SimBusOutput, SimEvent, SimLog};

    #[test]
    fn write_nibble_is_lsb_first() {
        let log = SimLog::new();
        let bus = SimBusOutput::<4>::new("data", &log);
        let bus: &dyn GpioBusOutput<4> = &bus;

        bus.write_nibble(0b0010).unwrap();

        assert_eq!(
            log.events(),
            vec![SimEvent::Bus("data", vec![false, true, false, false])]
        );
    }

    #[test]
    fn write_nibble_rejects_wide_values() {
        let log = SimLog::new();
        let bus = SimBusOutput::<4>::new("data", &log);
        let bus: &dyn GpioBusOutput<4> = &bus;

        assert_eq!(bus.write_nibble(0x10), Err(GpioError::InvalidArgument));
        assert!(log.events().is_empty());
    }

    #[test]
    fn read_nibble_is_lsb_first() {
        let input = SimBusInput::new([true, false, true, true]);
        let bus: &dyn GpioBusInput<4> = &input;

        assert_eq!(bus.read_nibble(), Ok(0b1101));

        input.set([false, false, false, true]);
        assert_eq!(bus.read_nibble(), Ok(0b1000));
    }
}
