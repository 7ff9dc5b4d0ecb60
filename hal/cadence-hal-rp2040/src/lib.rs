//! RP2040 implementation of the Cadence hardware traits
//!
//! - GPIO ports over embassy `Flex` pins, taken by number from a [`pins::PinBank`]
//! - Pin interrupt shim: per-pin async watchers driven by [`watch::PinWatch`]
//! - PIO step sequencer and PIO step tick timer
//! - PWM channels and ADC inputs
//! - Microsecond clock over `embassy-time`

#![no_std]
#![deny(unsafe_code)]

pub mod adc;
pub mod clock;
pub mod pins;
pub mod pio;
pub mod port;
pub mod pwm;
pub mod watch;

/// System clock frequency (RP2040 default)
pub const SYS_CLK_HZ: u32 = 125_000_000;

/// Number of user GPIOs
pub const NUM_GPIO: usize = 30;
