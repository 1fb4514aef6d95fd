mod access;
mod app;
mod config;
mod input;
mod pins;
mod utils;

use dotenv::dotenv;
use log::{debug, info};
use pinpad_gpio::GpioBias::PullUp;
use pinpad_gpio::GpioDriver;
use pinpad_gpio::delay::ThreadDelay;
use pinpad_gpio::gpiod::GpiodDriver;
use pinpad_gpio::keypad::GpioKeypad;
use pinpad_gpio::lcd::hd44780::driver::{GpioHD44780Driver, HD44780Driver};
use pinpad_gpio::raw::RawGpioDriver;
use sysinfo::System;
use crate::app::App;
use crate::config::{Config, GpioBackend};

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!("PinPad v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "System ver {} kernel ver {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
    info!(
        "Hostname {}, architecture {}",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR),
        System::cpu_arch(),
    );

    debug!("Trying to load config...");
    let config = if let Some(config) = Config::try_load()? {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved to {}.", Config::path().display());
        config
    };

    debug!("Initializing {:?} GPIO driver...", config.backend);
    match config.backend {
        GpioBackend::Gpiomem => run(&RawGpioDriver::new_gpiomem()?),
        GpioBackend::Mem => run(&RawGpioDriver::new_mem()?),
        GpioBackend::Gpiod => run(&GpiodDriver::open(&config.gpiod_chip)?),
    }
}

/// Brings up the LCD and keypad on `gpio` and runs the terminal until the hardware fails.
fn run<D: GpioDriver>(gpio: &D) -> eyre::Result<()> {
    debug!("{:?} initialized.", gpio);
    info!(
        "LCD @ E: {}, RW: {}, RS: {}, Data: {:?}",
        pins::LCD_E, pins::LCD_RW, pins::LCD_RS, pins::LCD_DATA
    );
    info!("Keypad @ Rows: {:?}, Cols: {:?}", pins::KEYPAD_ROWS, pins::KEYPAD_COLS);

    let delay = ThreadDelay;

    debug!("Initializing LCD driver...");
    let mut lcd_e_pin = gpio.get_pin(pins::LCD_E)?;
    let lcd_e_out = lcd_e_pin.as_output()?;
    let mut lcd_rw_pin = gpio.get_pin(pins::LCD_RW)?;
    let lcd_rw_out = lcd_rw_pin.as_output()?;
    let mut lcd_rs_pin = gpio.get_pin(pins::LCD_RS)?;
    let lcd_rs_out = lcd_rs_pin.as_output()?;
    let mut lcd_data_bus = gpio.get_pin_bus(pins::LCD_DATA)?;
    let lcd_data_out = lcd_data_bus.as_output()?;
    let mut lcd = GpioHD44780Driver::new_4bit(
        &*lcd_e_out,
        &*lcd_rw_out,
        &*lcd_rs_out,
        &*lcd_data_out,
        &delay,
    );

    lcd.init(true, false)?;
    debug!("{:?} initialized.", lcd);

    debug!("Initializing keypad driver...");
    let mut keypad_row_bus = gpio.get_pin_bus(pins::KEYPAD_ROWS)?;
    let mut keypad_col_bus = gpio.get_pin_bus(pins::KEYPAD_COLS)?;
    keypad_col_bus.set_bias(PullUp)?;
    let keypad_row_out = keypad_row_bus.as_output()?;
    let keypad_col_in = keypad_col_bus.as_input()?;

    let keypad = GpioKeypad::new(&*keypad_row_out, &*keypad_col_in, &delay);
    debug!("{:?} initialized.", keypad);

    info!("PinPad initialized. Starting main loop...");

    let mut app = App::new(&mut lcd, &keypad, &delay);
    app.run()?;

    Ok(())
}
