//! Discrete outputs on a 16-bit shift register
//!
//! Writes update a shadow word; `flush` shifts the whole word out.

use cadence_core::periph::OutputBackend;
use cadence_core::signals::{PinFunction, PortKind};
use cadence_hal::{HalResult, ShiftRegister};

use super::OutputMap;

pub struct Sr16Outputs<R> {
    register: R,
    map: OutputMap,
    shadow: u16,
}

impl<R: ShiftRegister> Sr16Outputs<R> {
    pub fn new(register: R, map: OutputMap) -> Self {
        Self {
            register,
            map,
            shadow: 0,
        }
    }

    /// Levels as last set, flushed or not
    pub fn shadow(&self) -> u16 {
        self.shadow
    }

    pub fn register(&self) -> &R {
        &self.register
    }
}

impl<R: ShiftRegister> OutputBackend for Sr16Outputs<R> {
    fn port(&self) -> PortKind {
        PortKind::ShiftRegister16
    }

    fn set(&mut self, function: PinFunction, high: bool) {
        let Some(pin) = self.map.pin(function).filter(|p| *p < 16) else {
            return;
        };
        if high {
            self.shadow |= 1 << pin;
        } else {
            self.shadow &= !(1 << pin);
        }
    }

    fn get(&self, function: PinFunction) -> Option<bool> {
        let pin = self.map.pin(function).filter(|p| *p < 16)?;
        Some(self.shadow & (1 << pin) != 0)
    }

    fn flush(&mut self) -> HalResult<()> {
        self.register.write(u32::from(self.shadow));
        Ok(())
    }
}
