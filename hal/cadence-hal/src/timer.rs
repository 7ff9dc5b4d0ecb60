//! Timing primitives
//!
//! [`TickTimer`] is the periodic source that paces step generation.
//! [`MicrosClock`] is the free-running microsecond time base.

/// Periodic step interrupt source
///
/// The period is expressed in cycles of the timer's own clock
/// ([`TickTimer::frequency_hz`]).
pub trait TickTimer {
    /// Timer input clock in Hz
    fn frequency_hz(&self) -> u32;

    /// Program the interval between ticks
    ///
    /// Takes effect from the next tick when the timer is running.
    fn set_period(&mut self, cycles: u32);

    /// Start generating ticks
    fn start(&mut self);

    /// Stop generating ticks
    fn stop(&mut self);
}

/// Free-running microsecond clock
pub trait MicrosClock {
    /// Microseconds since boot
    fn now_us(&self) -> u64;

    /// Milliseconds since boot
    fn now_ms(&self) -> u64 {
        self.now_us() / 1000
    }
}
