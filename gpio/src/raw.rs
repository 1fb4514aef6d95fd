//! Memory-mapped GPIO on Broadcom SoCs.
//!
//! Maps the GPIO register block from `/dev/gpiomem` (no root needed) or `/dev/mem` and pokes the
//! function-select, set/clear, level and pull registers directly. Lines are claimed through a
//! bitmap so two drivers can't grab the same pin.
use crate::{GpioBias, GpioBus, GpioBusInput, GpioBusOutput, GpioDriver, GpioError, GpioOutput, GpioPin, GpioResult};
use bitvec::vec::BitVec;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::sync::atomic::AtomicU8;

/// Pin function codes for the GPFSELn registers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
enum PinFunction {
    Input = 0b000,
    Output = 0b001,
}

pub struct RawGpioDriver {
    mmap: MmapRaw,
    used_pins: BitVec<AtomicU8>,
}

impl RawGpioDriver {
    const GPIO_BASE: u64 = 0x3F200000;
    const PIN_COUNT: usize = 58;

    // Register offsets in 32-bit words
    const GPFSEL0: usize = 0x00 / 4;
    const GPSET0: usize = 0x1C / 4;
    const GPCLR0: usize = 0x28 / 4;
    const GPLEV0: usize = 0x34 / 4;
    const GPIO_PUP_PDN_CNTRL_REG0: usize = 0xE4 / 4;

    fn create(path: &str) -> GpioResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let mmap = MmapOptions::new()
            .offset(Self::GPIO_BASE)
            .len(4096)
            .map_raw(&file)?;

        Ok(RawGpioDriver {
            mmap,
            used_pins: BitVec::repeat(false, Self::PIN_COUNT),
        })
    }

    pub fn new_gpiomem() -> GpioResult<Self> {
        Self::create("/dev/gpiomem")
    }

    pub fn new_mem() -> GpioResult<Self> {
        Self::create("/dev/mem")
    }

    fn check_index(pin_index: usize) -> GpioResult<()> {
        if pin_index < Self::PIN_COUNT {
            Ok(())
        } else {
            Err(GpioError::InvalidArgument)
        }
    }

    fn register(&self, word: usize) -> *mut u32 {
        // SAFETY: every offset used is inside the 4 KiB mapping
        unsafe { (self.mmap.as_mut_ptr() as *mut u32).add(word) }
    }

    /// Replaces the `width`-bit field of pin `pin_index` in a register bank where each register
    /// packs `32 / width` pins.
    fn write_field(&self, bank: usize, pin_index: usize, width: usize, value: u32) {
        let per_register = 32 / width;
        let register = self.register(bank + pin_index / per_register);
        let shift = (pin_index % per_register) * width;
        let mask = ((1u32 << width) - 1) << shift;

        // SAFETY: `register` points into the live mapping; volatile because it's MMIO
        unsafe {
            let current = register.read_volatile();
            register.write_volatile((current & !mask) | (value << shift) & mask);
        }
    }

    fn read_field(&self, bank: usize, pin_index: usize, width: usize) -> u32 {
        let per_register = 32 / width;
        let register = self.register(bank + pin_index / per_register);
        let shift = (pin_index % per_register) * width;

        // SAFETY: as in `write_field`
        let current = unsafe { register.read_volatile() };
        (current >> shift) & ((1u32 << width) - 1)
    }

    fn set_function(&self, pin_index: usize, function: PinFunction) -> GpioResult<()> {
        Self::check_index(pin_index)?;
        self.write_field(Self::GPFSEL0, pin_index, 3, function as u32);
        Ok(())
    }

    fn set_level(&self, pin_index: usize, high: bool) -> GpioResult<()> {
        Self::check_index(pin_index)?;
        // GPSETn/GPCLRn only act on the bits written as 1
        let bank = if high { Self::GPSET0 } else { Self::GPCLR0 };
        let register = self.register(bank + pin_index / 32);
        // SAFETY: as in `write_field`
        unsafe { register.write_volatile(1 << (pin_index % 32)) };
        Ok(())
    }

    fn level(&self, pin_index: usize) -> GpioResult<bool> {
        Self::check_index(pin_index)?;
        Ok(self.read_field(Self::GPLEV0, pin_index, 1) != 0)
    }

    fn set_pull(&self, pin_index: usize, bias: GpioBias) -> GpioResult<()> {
        Self::check_index(pin_index)?;
        let value = match bias {
            GpioBias::None => 0b00,
            GpioBias::PullUp => 0b01,
            GpioBias::PullDown => 0b10,
        };
        self.write_field(Self::GPIO_PUP_PDN_CNTRL_REG0, pin_index, 2, value);
        Ok(())
    }

    fn pull(&self, pin_index: usize) -> GpioResult<GpioBias> {
        Self::check_index(pin_index)?;
        match self.read_field(Self::GPIO_PUP_PDN_CNTRL_REG0, pin_index, 2) {
            0b00 => Ok(GpioBias::None),
            0b01 => Ok(GpioBias::PullUp),
            0b10 => Ok(GpioBias::PullDown),
            _ => Err(GpioError::NotSupported),
        }
    }

    /// Puts a freshly claimed pin into a known state: floating input, output latch low.
    fn reset(&self, pin_index: usize) -> GpioResult<()> {
        self.set_function(pin_index, PinFunction::Input)?;
        self.set_pull(pin_index, GpioBias::None)?;
        self.set_level(pin_index, false)
    }

    fn claim(&self, indices: &[usize]) -> GpioResult<()> {
        if indices.iter().any(|&index| index >= Self::PIN_COUNT) {
            return Err(GpioError::InvalidArgument);
        }
        if indices.iter().any(|&index| self.used_pins[index]) {
            return Err(GpioError::AlreadyInUse);
        }
        for &index in indices {
            self.used_pins.set_aliased(index, true);
            self.reset(index)?;
        }
        Ok(())
    }

    fn release(&self, pin_index: usize) {
        _ = self.set_function(pin_index, PinFunction::Input);
        self.used_pins.set_aliased(pin_index, false);
    }
}

impl Debug for RawGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioDriver({:#x})", self.mmap.as_ptr().addr())
    }
}

impl GpioDriver for RawGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(Self::PIN_COUNT)
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        self.claim(&[index])?;
        Ok(Box::new(RawGpioPin {
            driver: self,
            pin_index: index,
        }))
    }

    fn get_pin_bus<const N: usize>(&self, indices: [usize; N]) -> GpioResult<Box<dyn GpioBus<N> + '_>> {
        self.claim(&indices)?;
        Ok(Box::new(RawGpioBus {
            driver: self,
            pin_indices: indices,
        }))
    }
}

struct RawGpioPin<'a> {
    driver: &'a RawGpioDriver,
    pin_index: usize,
}

impl Debug for RawGpioPin<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.pin_index)
    }
}

impl GpioPin for RawGpioPin<'_> {
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>> {
        self.driver.set_function(self.pin_index, PinFunction::Output)?;
        Ok(Box::new(RawGpioOutput { pin: self }))
    }

    fn bias(&self) -> GpioBias {
        self.driver.pull(self.pin_index).unwrap_or_default()
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.driver.set_pull(self.pin_index, bias)
    }
}

impl Drop for RawGpioPin<'_> {
    fn drop(&mut self) {
        self.driver.release(self.pin_index);
    }
}

struct RawGpioOutput<'a> {
    pin: &'a RawGpioPin<'a>,
}

impl Debug for RawGpioOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.pin)
    }
}

impl GpioOutput for RawGpioOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.pin.driver.set_level(self.pin.pin_index, value)
    }
}

struct RawGpioBus<'a, const N: usize> {
    driver: &'a RawGpioDriver,
    pin_indices: [usize; N],
}

impl<const N: usize> Debug for RawGpioBus<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.driver, self.pin_indices)
    }
}

impl<const N: usize> GpioBus<N> for RawGpioBus<'_, N> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>> {
        for &pin_index in &self.pin_indices {
            self.driver.set_function(pin_index, PinFunction::Input)?;
        }
        Ok(Box::new(RawGpioBusInput { bus: self }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        for &pin_index in &self.pin_indices {
            self.driver.set_function(pin_index, PinFunction::Output)?;
        }
        Ok(Box::new(RawGpioBusOutput { bus: self }))
    }

    fn bias(&self) -> GpioBias {
        self.driver.pull(self.pin_indices[0]).unwrap_or_default()
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        for &pin_index in &self.pin_indices {
            self.driver.set_pull(pin_index, bias)?;
        }
        Ok(())
    }
}

impl<const N: usize> Drop for RawGpioBus<'_, N> {
    fn drop(&mut self) {
        for &pin_index in &self.pin_indices {
            self.driver.release(pin_index);
        }
    }
}

struct RawGpioBusInput<'a, const N: usize> {
    bus: &'a RawGpioBus<'a, N>,
}

impl<const N: usize> Debug for RawGpioBusInput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.bus)
    }
}

impl<const N: usize> GpioBusInput<N> for RawGpioBusInput<'_, N> {
    fn read(&self) -> GpioResult<[bool; N]> {
        let mut values = [false; N];
        for (value, &pin_index) in values.iter_mut().zip(&self.bus.pin_indices) {
            *value = self.bus.driver.level(pin_index)?;
        }
        Ok(values)
    }
}

struct RawGpioBusOutput<'a, const N: usize> {
    bus: &'a RawGpioBus<'a, N>,
}

impl<const N: usize> Debug for RawGpioBusOutput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.bus)
    }
}

impl<const N: usize> GpioBusOutput<N> for RawGpioBusOutput<'_, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        for (&value, &pin_index) in values.iter().zip(&self.bus.pin_indices) {
            self.bus.driver.set_level(pin_index, value)?;
        }
        Ok(())
    }
}
