use crate::delay::Delay;
use crate::lcd::hd44780::driver::{CursorDirection, HD44780Driver};
use crate::{GpioBusOutput, GpioOutput, GpioResult};
use log::trace;

/// HD44780 driven by bit-banging GPIO lines over a 4-bit data bus.
///
/// The bus carries D4..D7 with D4 as bit 0. Nothing is ever read back from the controller, so
/// R/W is held low for every transfer.
#[derive(Debug)]
pub struct GpioHD44780Driver<'a> {
    pin_e: &'a dyn GpioOutput,
    pin_rw: &'a dyn GpioOutput,
    pin_rs: &'a dyn GpioOutput,
    data_bus: &'a dyn GpioBusOutput<4>,
    delay: &'a dyn Delay,
}

impl<'a> GpioHD44780Driver<'a> {
    /// Wait before raising E, and E high time.
    pub const STROBE_SETUP_US: u64 = 1;
    /// Wait after dropping E, long enough for any instruction except clear/home.
    pub const STROBE_HOLD_MS: u64 = 1;
    /// Wait after power-on before the first instruction.
    pub const POWER_ON_MS: u64 = 20;
    /// Wait after the init sequence, covering the trailing clear.
    pub const INIT_SETTLE_MS: u64 = 2;

    pub fn new_4bit(
        pin_e: &'a dyn GpioOutput,
        pin_rw: &'a dyn GpioOutput,
        pin_rs: &'a dyn GpioOutput,
        data_bus: &'a dyn GpioBusOutput<4>,
        delay: &'a dyn Delay,
    ) -> Self {
        GpioHD44780Driver {
            pin_e,
            pin_rw,
            pin_rs,
            data_bus,
            delay,
        }
    }

    /// Latches whatever is on the data bus.
    fn pulse_e(&self) -> GpioResult<()> {
        self.delay.sleep_us(Self::STROBE_SETUP_US);
        self.pin_e.write(true)?;
        self.delay.sleep_us(Self::STROBE_SETUP_US);
        self.pin_e.write(false)?;
        self.delay.sleep_ms(Self::STROBE_HOLD_MS);
        Ok(())
    }

    fn send(&mut self, data: u8, rs: bool) -> GpioResult<()> {
        trace!("Sending data: {:08b}, RS: {}", data, rs);

        self.pin_rs.write(rs)?;
        self.pin_rw.write(false)?;

        let high_nibble = (data >> 4) & 0x0F;
        let low_nibble = data & 0x0F;

        trace!("Writing HN: {:04b}", high_nibble);
        self.data_bus.write_nibble(high_nibble)?;
        self.pulse_e()?;

        trace!("Writing LN: {:04b}", low_nibble);
        self.data_bus.write_nibble(low_nibble)?;
        self.pulse_e()
    }
}

impl HD44780Driver for GpioHD44780Driver<'_> {
    fn init(&mut self, multiline: bool, alt_font: bool) -> GpioResult<()> {
        self.delay.sleep_ms(Self::POWER_ON_MS);

        // Three 8-bit function sets, then the switch to 4-bit, packed into two bytes
        self.send(0b00110011, false)?;
        self.send(0b00110010, false)?;

        self.function_set(false, multiline, alt_font)?;
        self.set_display_control(true, false, false)?;
        self.set_entry_mode(CursorDirection::Right, false)?;
        self.clear_display()?;

        self.delay.sleep_ms(Self::INIT_SETTLE_MS);
        Ok(())
    }

    fn send_command(&mut self, command: u8) -> GpioResult<()> {
        self.send(command, false)
    }

    fn send_data(&mut self, data: u8) -> GpioResult<()> {
        self.send(data, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimBusOutput, SimDelay, SimEvent, SimLog, SimOutput};
    use std::time::Duration;

    struct Rig {
        log: SimLog,
        e: SimOutput,
        rw: SimOutput,
        rs: SimOutput,
        bus: SimBusOutput<4>,
        delay: SimDelay,
    }

    impl Rig {
        fn new() -> Self {
            let log = SimLog::new();
            Rig {
                e: SimOutput::new("e", &log),
                rw: SimOutput::new("rw", &log),
                rs: SimOutput::new("rs", &log),
                bus: SimBusOutput::new("data", &log),
                delay: SimDelay::new(&log),
                log,
            }
        }

        fn driver(&self) -> GpioHD44780Driver<'_> {
            GpioHD44780Driver::new_4bit(&self.e, &self.rw, &self.rs, &self.bus, &self.delay)
        }
    }

    /// Rebuilds the (RS, byte) pairs the controller would have latched on each rising E edge.
    fn latched_bytes(events: &[SimEvent]) -> Vec<(bool, u8)> {
        let mut rs = false;
        let mut bus = 0u8;
        let mut high: Option<u8> = None;
        let mut bytes = Vec::new();

        for event in events {
            match event {
                SimEvent::Pin("rs", level) => rs = *level,
                SimEvent::Bus("data", values) => {
                    bus = values
                        .iter()
                        .enumerate()
                        .fold(0, |acc, (i, &v)| acc | (v as u8) << i);
                }
                SimEvent::Pin("e", true) => match high.take() {
                    None => high = Some(bus),
                    Some(h) => bytes.push((rs, h << 4 | bus)),
                },
                _ => {}
            }
        }

        bytes
    }

    #[test]
    fn send_data_writes_high_nibble_first() {
        let rig = Rig::new();
        rig.driver().send_data(b'A').unwrap();

        let strobe = [
            SimEvent::Sleep(Duration::from_micros(1)),
            SimEvent::Pin("e", true),
            SimEvent::Sleep(Duration::from_micros(1)),
            SimEvent::Pin("e", false),
            SimEvent::Sleep(Duration::from_millis(1)),
        ];
        let mut expected = vec![
            SimEvent::Pin("rs", true),
            SimEvent::Pin("rw", false),
            SimEvent::Bus("data", vec![false, false, true, false]),
        ];
        expected.extend(strobe.iter().cloned());
        expected.push(SimEvent::Bus("data", vec![true, false, false, false]));
        expected.extend(strobe.iter().cloned());

        assert_eq!(rig.log.events(), expected);
    }

    #[test]
    fn send_command_clears_rs() {
        let rig = Rig::new();
        rig.driver().send_command(0xC5).unwrap();

        assert_eq!(latched_bytes(&rig.log.events()), vec![(false, 0xC5)]);
    }

    #[test]
    fn init_sequence() {
        let rig = Rig::new();
        rig.driver().init(true, false).unwrap();

        let events = rig.log.events();
        let commands: Vec<u8> = latched_bytes(&events)
            .into_iter()
            .map(|(rs, byte)| {
                assert!(!rs);
                byte
            })
            .collect();

        assert_eq!(commands, vec![0x33, 0x32, 0x28, 0x0C, 0x06, 0x01]);
        assert_eq!(events.first(), Some(&SimEvent::Sleep(Duration::from_millis(20))));
        assert_eq!(events.last(), Some(&SimEvent::Sleep(Duration::from_millis(2))));
    }

    #[test]
    fn rw_is_held_low() {
        let rig = Rig::new();
        let mut driver = rig.driver();
        driver.send_command(0x01).unwrap();
        driver.send_data(b'x').unwrap();

        assert!(
            rig.log
                .events()
                .iter()
                .all(|event| *event != SimEvent::Pin("rw", true))
        );
    }
}
