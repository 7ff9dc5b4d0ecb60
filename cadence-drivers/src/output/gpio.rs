//! Discrete outputs on direct GPIO

use cadence_core::periph::OutputBackend;
use cadence_core::signals::{PinFunction, PortKind};
use cadence_hal::GpioPort;

use super::OutputMap;

/// Writes go straight to the port; nothing is buffered
pub struct GpioOutputs<G> {
    gpio: G,
    map: OutputMap,
}

impl<G: GpioPort> GpioOutputs<G> {
    pub fn new(gpio: G, map: OutputMap) -> Self {
        Self { gpio, map }
    }

    pub fn gpio(&self) -> &G {
        &self.gpio
    }
}

impl<G: GpioPort> OutputBackend for GpioOutputs<G> {
    fn port(&self) -> PortKind {
        PortKind::Gpio
    }

    #[inline]
    fn set(&mut self, function: PinFunction, high: bool) {
        if let Some(pin) = self.map.pin(function) {
            self.gpio.write_pin(pin, high);
        }
    }

    fn get(&self, function: PinFunction) -> Option<bool> {
        let pin = self.map.pin(function)?;
        Some(self.gpio.output_state() & (1 << pin) != 0)
    }
}
