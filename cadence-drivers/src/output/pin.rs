//! Discrete outputs over `embedded-hal` output pins
//!
//! For boards where outputs are individual pins from a third-party HAL
//! rather than a port word. A failed pin write is remembered and reported
//! by the next `flush`.

use embedded_hal::digital::{OutputPin, PinState};
use heapless::Vec;

use cadence_core::periph::OutputBackend;
use cadence_core::signals::{PinFunction, PortKind};
use cadence_hal::{HalError, HalResult};

struct BankPin<P> {
    function: PinFunction,
    pin: P,
    high: bool,
}

pub struct PinBank<P, const N: usize> {
    pins: Vec<BankPin<P>, N>,
    failed: bool,
}

impl<P: OutputPin, const N: usize> Default for PinBank<P, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: OutputPin, const N: usize> PinBank<P, N> {
    pub const fn new() -> Self {
        Self {
            pins: Vec::new(),
            failed: false,
        }
    }

    /// Bind `pin` to `function`, driven low
    pub fn add(&mut self, function: PinFunction, mut pin: P) -> HalResult<()> {
        if self.pins.iter().any(|p| p.function == function) {
            return Err(HalError::InvalidParameter);
        }
        pin.set_low().map_err(|_| HalError::BusError)?;
        self.pins
            .push(BankPin {
                function,
                pin,
                high: false,
            })
            .map_err(|_| HalError::Busy)
    }
}

impl<P: OutputPin, const N: usize> OutputBackend for PinBank<P, N> {
    fn port(&self) -> PortKind {
        PortKind::Gpio
    }

    fn set(&mut self, function: PinFunction, high: bool) {
        if let Some(p) = self.pins.iter_mut().find(|p| p.function == function) {
            match p.pin.set_state(PinState::from(high)) {
                Ok(()) => p.high = high,
                Err(_) => self.failed = true,
            }
        }
    }

    fn get(&self, function: PinFunction) -> Option<bool> {
        self.pins
            .iter()
            .find(|p| p.function == function)
            .map(|p| p.high)
    }

    fn flush(&mut self) -> HalResult<()> {
        if core::mem::take(&mut self.failed) {
            Err(HalError::BusError)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::config::DriverSettings;
    use cadence_core::periph::Outputs;
    use cadence_core::signals::SpindleState;
    use core::convert::Infallible;
    use embedded_hal::digital::{ErrorKind, ErrorType};

    #[derive(Default)]
    struct MockPin {
        high: bool,
    }

    impl ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            Ok(())
        }
    }

    struct BrokenPin;

    impl ErrorType for BrokenPin {
        type Error = ErrorKind;
    }

    impl OutputPin for BrokenPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            Err(ErrorKind::Other)
        }
    }

    #[test]
    fn test_spindle_pins_through_bank() {
        let mut bank: PinBank<MockPin, 4> = PinBank::new();
        bank.add(PinFunction::SpindleOn, MockPin::default()).unwrap();
        bank.add(PinFunction::SpindleDir, MockPin::default()).unwrap();
        assert_eq!(
            bank.add(PinFunction::SpindleOn, MockPin::default()),
            Err(HalError::InvalidParameter)
        );

        let mut out = Outputs::new(bank, &DriverSettings::default());
        out.spindle_dir(true);
        out.spindle_enable(true);
        assert_eq!(out.spindle_pins(), SpindleState { on: true, ccw: true });
        assert!(out.backend().pins[0].pin.high);
    }

    #[test]
    fn test_write_error_reported_on_flush() {
        let mut bank: PinBank<BrokenPin, 2> = PinBank::new();
        bank.add(PinFunction::CoolantFlood, BrokenPin).unwrap();
        bank.set(PinFunction::CoolantFlood, true);
        assert_eq!(bank.get(PinFunction::CoolantFlood), Some(false));
        assert_eq!(bank.flush(), Err(HalError::BusError));
        assert_eq!(bank.flush(), Ok(()));
    }
}
