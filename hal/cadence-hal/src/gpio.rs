//! GPIO abstractions
//!
//! A port-wide trait for the hot paths (step/dir, input scans) that read or
//! write many pins at once. Single-line drivers use `embedded-hal` directly.

/// A bank of up to 32 GPIO lines addressed by bit position
///
/// Bit `n` of every mask corresponds to GPIO `n`. Implementations must make
/// `write_masked` a bounded, non-blocking operation: it is called from the
/// step interrupt.
pub trait GpioPort {
    /// Raw input levels of all pins (bit set = electrically high)
    fn read(&self) -> u32;

    /// Drive the pins selected by `mask` to the matching bits of `value`
    fn write_masked(&mut self, mask: u32, value: u32);

    /// Levels currently driven on output pins
    fn output_state(&self) -> u32;

    /// Raw level of a single pin
    fn level(&self, pin: u8) -> bool {
        self.read() & (1 << pin) != 0
    }

    /// Drive a single pin
    fn write_pin(&mut self, pin: u8, high: bool) {
        let bit = 1 << pin;
        self.write_masked(bit, if high { bit } else { 0 });
    }

    /// Configure a pin as input with the given pull resistors
    fn set_pull(&mut self, pin: u8, pull: Pull);
}

/// Input pull resistor selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    /// No pull resistor
    None,
    /// Pull-up to VCC
    #[default]
    Up,
    /// Pull-down to ground
    Down,
}
