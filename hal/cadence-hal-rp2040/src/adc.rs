//! ADC inputs on GPIO 26-29

use embassy_rp::adc::{Adc, Blocking, Channel};
use heapless::Vec;

use cadence_hal::AnalogInput;

/// First GPIO with an ADC channel
pub const ADC_BASE_PIN: u8 = 26;

/// ADC channel for a GPIO, if it has one
pub const fn adc_channel(pin: u8) -> Option<u8> {
    if pin >= ADC_BASE_PIN && pin < ADC_BASE_PIN + 4 {
        Some(pin - ADC_BASE_PIN)
    } else {
        None
    }
}

/// Blocking single-shot reads of the configured channels
pub struct RpAdc<'d> {
    adc: Adc<'d, Blocking>,
    channels: Vec<(u8, Channel<'d>), 4>,
}

impl<'d> RpAdc<'d> {
    pub fn new(adc: Adc<'d, Blocking>) -> Self {
        Self {
            adc,
            channels: Vec::new(),
        }
    }

    /// Add the channel on GPIO `pin`
    ///
    /// Returns false if the pin has no ADC channel or the table is full.
    pub fn add(&mut self, pin: u8, channel: Channel<'d>) -> bool {
        adc_channel(pin).is_some() && self.channels.push((pin, channel)).is_ok()
    }
}

impl AnalogInput for RpAdc<'_> {
    fn read(&mut self, pin: u8) -> Option<u16> {
        let (_, channel) = self.channels.iter_mut().find(|(p, _)| *p == pin)?;
        match self.adc.blocking_read(channel) {
            Ok(v) => Some(v),
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("ADC read on GPIO{} failed: {}", pin, _e);
                None
            }
        }
    }
}
