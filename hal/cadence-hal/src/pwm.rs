//! PWM output abstraction

use crate::error::HalResult;

/// Hardware PWM timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmTiming {
    /// Integer clock divider applied to the system clock
    pub prescaler: u32,
    /// Counter wrap value (period in PWM clock cycles)
    pub period: u32,
    /// Output polarity inverted
    pub invert: bool,
}

/// A single PWM output channel
pub trait PwmChannel {
    /// Configure and start the channel
    fn configure(&mut self, timing: PwmTiming) -> HalResult<()>;

    /// Set the compare level (duty in counter cycles)
    fn set_level(&mut self, level: u32);

    /// Current compare level
    fn level(&self) -> u32;
}
