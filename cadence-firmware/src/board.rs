//! Board pin map
//!
//! Generated by `build.rs` from `board.toml`. Pins that embassy needs as
//! concrete types (PWM outputs, ADC inputs) are split out here; the rest
//! stay in the [`PinBank`] to be taken by number.

use embassy_rp::adc::Channel;
use embassy_rp::gpio::Pull;
use embassy_rp::peripherals::{ADC, PIO0};
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use embassy_rp::{Peri, Peripherals};
use heapless::Vec;

use cadence_core::periph::aux::MAX_ANALOG_PORTS;
use cadence_core::signals::{Axis, BoardPin, Motor, PinFunction, PortKind};
use cadence_hal_rp2040::pins::PinBank;
use cadence_hal_rp2040::pwm::{RpPwm, SliceOutput};

include!(concat!(env!("OUT_DIR"), "/board.rs"));

/// Peripherals left after splitting the pins
pub struct BoardPeripherals {
    pub pio0: Peri<'static, PIO0>,
    pub adc: Peri<'static, ADC>,
    pub spindle_pwm: Option<RpPwm<'static>>,
    /// (analog output port, PWM)
    pub analog_out: Vec<(u8, RpPwm<'static>), MAX_ANALOG_PORTS>,
    /// (GPIO, ADC channel)
    pub analog_in: Vec<(u8, Channel<'static>), MAX_ANALOG_PORTS>,
}
