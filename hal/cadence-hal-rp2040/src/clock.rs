//! Microsecond time base

use cadence_hal::MicrosClock;
use embassy_time::Instant;

/// `embassy-time` uptime as a [`MicrosClock`]
#[derive(Debug, Clone, Copy, Default)]
pub struct UptimeClock;

impl MicrosClock for UptimeClock {
    fn now_us(&self) -> u64 {
        Instant::now().as_micros()
    }
}
