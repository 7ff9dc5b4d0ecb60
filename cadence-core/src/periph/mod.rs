//! Peripheral façade
//!
//! Motion-level operations on the machine's outputs: stepper drivers,
//! coolant, spindle and the auxiliary ports. Where the outputs physically
//! live (GPIO, shift register, I/O expander) is hidden behind
//! [`OutputBackend`].

pub mod aux;
pub mod outputs;
pub mod spindle;

use cadence_hal::HalResult;

use crate::signals::{PinFunction, PortKind};

pub use aux::{AnalogInputs, AnalogOutputs, AuxPortKind, PortClaims, ANALOG_OUT_FREQ_HZ};
pub use outputs::Outputs;
pub use spindle::{PwmRamp, Spindle};

/// Physical output bank addressed by pin function
pub trait OutputBackend {
    /// Port kind of this bank
    fn port(&self) -> PortKind;

    /// Drive the output bound to `function`
    ///
    /// Functions with no pin on this bank are ignored. Buffered backends
    /// only update their shadow copy until [`OutputBackend::flush`].
    fn set(&mut self, function: PinFunction, high: bool);

    /// Level last driven on `function`, `None` if the bank has no such pin
    fn get(&self, function: PinFunction) -> Option<bool>;

    /// Push buffered levels to the hardware
    fn flush(&mut self) -> HalResult<()> {
        Ok(())
    }
}
