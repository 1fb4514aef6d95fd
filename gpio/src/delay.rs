use std::fmt::Debug;
use std::time::Duration;

/// Blocking waits used by the drivers.
///
/// LCD strobes and keypad scanning are bit-banged, so the wait lengths are part of the wire
/// protocol. Drivers never call [std::thread::sleep] themselves, they go through this trait.
pub trait Delay: Debug {
    /// Blocks the calling thread for at least `duration`.
    fn sleep(&self, duration: Duration);

    fn sleep_us(&self, us: u64) {
        self.sleep(Duration::from_micros(us))
    }

    fn sleep_ms(&self, ms: u64) {
        self.sleep(Duration::from_millis(ms))
    }
}

/// [Delay] backed by the OS scheduler.
///
/// Sub-millisecond waits overshoot on a stock kernel. The HD44780 and the keypad only need
/// minimum durations, so that is harmless.
#[derive(Copy, Clone, Debug, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
