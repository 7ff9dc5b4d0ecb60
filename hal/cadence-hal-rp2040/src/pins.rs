//! GPIO allocation by number
//!
//! The board pin map names pins by GPIO number, so drivers take them from
//! a bank at runtime instead of by type from `Peripherals`. Pins that need
//! their concrete type (PWM, ADC) are taken before the bank is built.

use embassy_rp::gpio::AnyPin;
use embassy_rp::Peri;

use crate::NUM_GPIO;

/// Error when requesting a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// Pin number out of range (0-29 valid)
    InvalidPin(u8),
    /// Pin already taken
    AlreadyTaken(u8),
}

impl core::fmt::Display for PinError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidPin(n) => write!(f, "GPIO{} does not exist", n),
            Self::AlreadyTaken(n) => write!(f, "GPIO{} already taken", n),
        }
    }
}

/// Every GPIO, handed out once each
pub struct PinBank {
    pins: [Option<Peri<'static, AnyPin>>; NUM_GPIO],
}

impl PinBank {
    /// Bank over the given pins; `None` marks a pin used elsewhere
    pub fn from_pins(pins: [Option<Peri<'static, AnyPin>>; NUM_GPIO]) -> Self {
        Self { pins }
    }

    /// Take a pin by number
    pub fn take(&mut self, pin: u8) -> Result<Peri<'static, AnyPin>, PinError> {
        self.pins
            .get_mut(usize::from(pin))
            .ok_or(PinError::InvalidPin(pin))?
            .take()
            .ok_or(PinError::AlreadyTaken(pin))
    }

    /// Check if a pin is available
    pub fn is_available(&self, pin: u8) -> bool {
        self.pins
            .get(usize::from(pin))
            .is_some_and(|p| p.is_some())
    }
}
