//! Step/dir backends
//!
//! Each backend takes the physical step and direction levels computed by
//! the pulse generator and drives them on one kind of port. Pins are
//! resolved once through [`MotorMap`](cadence_core::stepper::MotorMap).

pub mod gpio;
pub mod sequencer;
pub mod shift;

pub use gpio::GpioStepBackend;
pub use sequencer::{PioStepWord, SequencerBackend, SEQUENCER_PINS};
pub use shift::ShiftStepBackend;
