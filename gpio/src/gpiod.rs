//! GPIO through the Linux character-device interface (`/dev/gpiochipN`).
//!
//! Slower than [crate::raw], but works on any board with a GPIO chip driver and does not need
//! the register layout of a particular SoC. Line requests are made when a pin or bus is switched
//! to input or output, and released when that handle is dropped.
use crate::{GpioBias, GpioBus, GpioBusInput, GpioBusOutput, GpioDriver, GpioError, GpioOutput, GpioPin, GpioResult};
use bitvec::vec::BitVec;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::atomic::AtomicU8;

pub struct GpiodDriver {
    chip: gpiod::Chip,
    used_pins: BitVec<AtomicU8>,
}

impl GpiodDriver {
    pub fn new(chip: gpiod::Chip) -> Self {
        let n = chip.num_lines() as usize;
        Self {
            chip,
            used_pins: BitVec::repeat(false, n),
        }
    }

    /// Opens the GPIO chip device at `path`, e.g. `/dev/gpiochip0`.
    pub fn open(path: impl AsRef<Path>) -> GpioResult<Self> {
        Ok(Self::new(gpiod::Chip::new(path.as_ref())?))
    }

    fn claim(&self, indices: &[usize]) -> GpioResult<()> {
        let n = self.count()?;
        if indices.iter().any(|&index| index >= n) {
            return Err(GpioError::InvalidArgument);
        }
        if indices.iter().any(|&index| self.used_pins[index]) {
            return Err(GpioError::AlreadyInUse);
        }
        for &index in indices {
            self.used_pins.set_aliased(index, true);
        }
        Ok(())
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.chip.name())
    }
}

impl GpioDriver for GpiodDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.chip.num_lines() as usize)
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        self.claim(&[index])?;
        Ok(Box::new(GpiodBus {
            driver: self,
            pin_indices: [index],
            bias: GpioBias::None,
        }))
    }

    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>> {
        self.claim(&indices)?;
        Ok(Box::new(GpiodBus {
            driver: self,
            pin_indices: indices,
            bias: GpioBias::None,
        }))
    }
}

impl From<GpioBias> for gpiod::Bias {
    fn from(bias: GpioBias) -> Self {
        match bias {
            GpioBias::None => gpiod::Bias::Disable,
            GpioBias::PullUp => gpiod::Bias::PullUp,
            GpioBias::PullDown => gpiod::Bias::PullDown,
        }
    }
}

/// A set of claimed lines. Single pins are buses of width one.
struct GpiodBus<'a, const N: usize> {
    driver: &'a GpiodDriver,
    pin_indices: [usize; N],
    bias: GpioBias,
}

impl<const N: usize> GpiodBus<'_, N> {
    fn offsets(&self) -> Vec<u32> {
        self.pin_indices.iter().map(|&index| index as u32).collect()
    }

    fn request_input(&self) -> GpioResult<gpiod::Lines<gpiod::Input>> {
        let options = gpiod::Options::input(self.offsets())
            .consumer(env!("CARGO_PKG_NAME"))
            .bias(self.bias.into());
        Ok(self.driver.chip.request_lines(options)?)
    }

    fn request_output(&self) -> GpioResult<gpiod::Lines<gpiod::Output>> {
        let options = gpiod::Options::output(self.offsets())
            .consumer(env!("CARGO_PKG_NAME"))
            .bias(self.bias.into());
        Ok(self.driver.chip.request_lines(options)?)
    }
}

impl<const N: usize> Debug for GpiodBus<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.driver, self.pin_indices)
    }
}

impl<const N: usize> Drop for GpiodBus<'_, N> {
    fn drop(&mut self) {
        for &index in &self.pin_indices {
            self.driver.used_pins.set_aliased(index, false);
        }
    }
}

impl GpioPin for GpiodBus<'_, 1> {
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>> {
        let line = self.request_output()?;
        Ok(Box::new(GpiodOutput { bus: self, line }))
    }

    fn bias(&self) -> GpioBias {
        self.bias
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.bias = bias;
        Ok(())
    }
}

impl<const N: usize> GpioBus<N> for GpiodBus<'_, N> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>> {
        let line = self.request_input()?;
        Ok(Box::new(GpiodInput { bus: self, line }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        let line = self.request_output()?;
        Ok(Box::new(GpiodOutput { bus: self, line }))
    }

    fn bias(&self) -> GpioBias {
        self.bias
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.bias = bias;
        Ok(())
    }
}

struct GpiodInput<'a, const N: usize> {
    bus: &'a GpiodBus<'a, N>,
    line: gpiod::Lines<gpiod::Input>,
}

impl<const N: usize> Debug for GpiodInput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.bus)
    }
}

impl<const N: usize> GpioBusInput<N> for GpiodInput<'_, N> {
    fn read(&self) -> GpioResult<[bool; N]> {
        Ok(self.line.get_values([false; N])?)
    }
}

struct GpiodOutput<'a, const N: usize> {
    bus: &'a GpiodBus<'a, N>,
    line: gpiod::Lines<gpiod::Output>,
}

impl<const N: usize> Debug for GpiodOutput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.bus)
    }
}

impl GpioOutput for GpiodOutput<'_, 1> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.line.set_values([value])?;
        Ok(())
    }
}

impl<const N: usize> GpioBusOutput<N> for GpiodOutput<'_, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        self.line.set_values(*values)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_chip_fails_with_io_error() {
        let result = GpiodDriver::open("/dev/pinpad-no-such-gpiochip");

        assert!(matches!(result, Err(GpioError::Io(_))), "{:?}", result);
    }
}
