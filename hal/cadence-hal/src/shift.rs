//! Serialised output peripherals
//!
//! Step/dir and auxiliary outputs may sit behind hardware that shifts whole
//! words out rather than toggling GPIOs: a programmable sequencer (PIO), a
//! shift register chain, or an I2C I/O expander.

use crate::error::HalResult;

/// Programmable step pulse sequencer
///
/// Each command word asserts the `set` bits after `delay` units, holds them
/// for `length` units, then drives the `reset` bits. Units are 0.1 µs.
pub trait StepSequencer {
    /// Queue one pulse command word
    fn push(&mut self, word: u32);

    /// Latch a level onto the sequencer pins without pulsing
    fn force_level(&mut self, bits: u32);
}

/// Shift register chain clocked by dedicated hardware
pub trait ShiftRegister {
    /// Shift a full word out and latch it
    fn write(&mut self, value: u32);

    /// Reprogram the pulse delay and hold times (0.1 µs units)
    fn set_timing(&mut self, _delay: u32, _hold: u32) {}
}

/// I/O expander on a serial bus
pub trait IoExpander {
    /// Write all output latches
    fn write_outputs(&mut self, value: u32) -> HalResult<()>;

    /// Read all input lines
    fn read_inputs(&mut self) -> HalResult<u32>;
}
