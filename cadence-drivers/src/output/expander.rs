//! Discrete outputs on an I2C I/O expander
//!
//! Like the SR16 bank, writes update a shadow word and `flush` sends it.
//! Bus errors surface from `flush`.

use embedded_hal::i2c::I2c;

use cadence_core::periph::OutputBackend;
use cadence_core::signals::{PinFunction, PortKind};
use cadence_hal::{HalError, HalResult, IoExpander};

use super::OutputMap;

pub struct ExpanderOutputs<X> {
    expander: X,
    map: OutputMap,
    shadow: u32,
}

impl<X: IoExpander> ExpanderOutputs<X> {
    pub fn new(expander: X, map: OutputMap) -> Self {
        Self {
            expander,
            map,
            shadow: 0,
        }
    }

    pub fn expander(&self) -> &X {
        &self.expander
    }

    pub fn expander_mut(&mut self) -> &mut X {
        &mut self.expander
    }
}

impl<X: IoExpander> OutputBackend for ExpanderOutputs<X> {
    fn port(&self) -> PortKind {
        PortKind::Expander
    }

    fn set(&mut self, function: PinFunction, high: bool) {
        if let Some(pin) = self.map.pin(function) {
            if high {
                self.shadow |= 1 << pin;
            } else {
                self.shadow &= !(1 << pin);
            }
        }
    }

    fn get(&self, function: PinFunction) -> Option<bool> {
        let pin = self.map.pin(function)?;
        Some(self.shadow & (1 << pin) != 0)
    }

    fn flush(&mut self) -> HalResult<()> {
        self.expander.write_outputs(self.shadow)
    }
}

// PCA9555 register map, port 1 follows port 0
const REG_INPUT0: u8 = 0x00;
const REG_OUTPUT0: u8 = 0x02;
const REG_CONFIG0: u8 = 0x06;

/// PCA9555 16-bit I2C port expander
pub struct Pca9555<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Pca9555<I2C> {
    /// Default bus address with A2..A0 tied low
    pub const DEFAULT_ADDRESS: u8 = 0x20;

    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Set pin directions: a set bit in `outputs` makes that pin an output
    pub fn init(&mut self, outputs: u16) -> HalResult<()> {
        let [lo, hi] = (!outputs).to_le_bytes();
        self.i2c
            .write(self.address, &[REG_CONFIG0, lo, hi])
            .map_err(|_| HalError::BusError)
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> IoExpander for Pca9555<I2C> {
    fn write_outputs(&mut self, value: u32) -> HalResult<()> {
        let [lo, hi, ..] = value.to_le_bytes();
        self.i2c
            .write(self.address, &[REG_OUTPUT0, lo, hi])
            .map_err(|_| HalError::BusError)
    }

    fn read_inputs(&mut self) -> HalResult<u32> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[REG_INPUT0], &mut buf)
            .map_err(|_| HalError::BusError)?;
        Ok(u32::from(u16::from_le_bytes(buf)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::signals::{BoardPin, SignalTable};
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};
    use heapless::Vec;

    #[derive(Default)]
    struct MockI2c {
        writes: Vec<(u8, Vec<u8, 4>), 8>,
        input: [u8; 2],
        fail: bool,
    }

    impl ErrorType for MockI2c {
        type Error = ErrorKind;
    }

    impl I2c for MockI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.fail {
                return Err(ErrorKind::Other);
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        let _ = self
                            .writes
                            .push((address, Vec::from_slice(bytes).unwrap()));
                    }
                    Operation::Read(buf) => buf.copy_from_slice(&self.input),
                }
            }
            Ok(())
        }
    }

    fn map() -> OutputMap {
        let table = SignalTable::from_board(&[
            BoardPin {
                function: PinFunction::CoolantFlood,
                port: PortKind::Expander,
                pin: 1,
            },
            BoardPin {
                function: PinFunction::AuxOut(0),
                port: PortKind::Expander,
                pin: 9,
            },
        ])
        .unwrap();
        OutputMap::from_table(&table, PortKind::Expander)
    }

    #[test]
    fn test_flush_writes_output_registers() {
        let pca = Pca9555::new(MockI2c::default(), Pca9555::<MockI2c>::DEFAULT_ADDRESS);
        let mut b = ExpanderOutputs::new(pca, map());
        b.set(PinFunction::CoolantFlood, true);
        b.set(PinFunction::AuxOut(0), true);
        b.flush().unwrap();

        let (addr, bytes) = b.expander().i2c.writes.last().unwrap();
        assert_eq!(*addr, 0x20);
        assert_eq!(bytes.as_slice(), &[REG_OUTPUT0, 0b10, 0b10]);
    }

    #[test]
    fn test_init_sets_output_directions() {
        let mut pca = Pca9555::new(MockI2c::default(), 0x21);
        pca.init(0x0202).unwrap();
        let (_, bytes) = pca.i2c.writes.last().unwrap();
        assert_eq!(bytes.as_slice(), &[REG_CONFIG0, 0xfd, 0xfd]);
    }

    #[test]
    fn test_read_inputs() {
        let mut pca = Pca9555::new(
            MockI2c {
                input: [0x34, 0x12],
                ..Default::default()
            },
            0x20,
        );
        assert_eq!(pca.read_inputs(), Ok(0x1234));
    }

    #[test]
    fn test_bus_error_reported() {
        let pca = Pca9555::new(
            MockI2c {
                fail: true,
                ..Default::default()
            },
            0x20,
        );
        let mut b = ExpanderOutputs::new(pca, map());
        b.set(PinFunction::CoolantFlood, true);
        assert_eq!(b.flush(), Err(HalError::BusError));
        // Shadow survives so the next flush retries
        assert_eq!(b.get(PinFunction::CoolantFlood), Some(true));
    }
}
