//! Output backends
//!
//! Each backend drives the discrete outputs (stepper enable, coolant,
//! spindle on/dir, digital aux) that the board puts on one port.

pub mod expander;
pub mod gpio;
pub mod pin;
pub mod shift;

use heapless::Vec;

use cadence_core::signals::{PinFunction, PortKind, SignalGroup, SignalTable};

pub use expander::{ExpanderOutputs, Pca9555};
pub use gpio::GpioOutputs;
pub use pin::PinBank;
pub use shift::Sr16Outputs;

/// Maximum outputs on one bank
pub const MAX_BANK_OUTPUTS: usize = 24;

/// Function → pin lookup for the discrete outputs of one port
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputMap {
    pins: Vec<(PinFunction, u8), MAX_BANK_OUTPUTS>,
}

impl OutputMap {
    /// Discrete outputs of `table` that live on `port`
    ///
    /// Step, direction and PWM outputs have their own drivers and are
    /// skipped.
    pub fn from_table(table: &SignalTable, port: PortKind) -> Self {
        let mut pins = Vec::new();
        for out in table.outputs().iter().filter(|o| o.port == port) {
            let discrete = !matches!(
                out.group,
                SignalGroup::StepperStep
                    | SignalGroup::StepperDir
                    | SignalGroup::SpindlePwm
                    | SignalGroup::AuxOutputAnalog
            );
            if discrete && pins.push((out.function, out.pin)).is_err() {
                #[cfg(feature = "defmt")]
                defmt::warn!("output bank full, {} not mapped", out.function);
            }
        }
        Self { pins }
    }

    pub fn pin(&self, function: PinFunction) -> Option<u8> {
        self.pins
            .iter()
            .find(|(f, _)| *f == function)
            .map(|(_, p)| *p)
    }

    /// Bit mask of every mapped pin
    pub fn mask(&self) -> u32 {
        self.pins.iter().fold(0, |m, (_, p)| m | 1 << p)
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}
