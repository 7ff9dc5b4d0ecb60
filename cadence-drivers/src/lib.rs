//! Backend implementations for the motion core
//!
//! Concrete [`StepBackend`](cadence_core::stepper::StepBackend) and
//! [`OutputBackend`](cadence_core::periph::OutputBackend) implementations
//! over the `cadence-hal` traits:
//!
//! - Step/dir: direct GPIO, PIO step sequencer, 8-bit shift register
//! - Outputs: direct GPIO, 16-bit shift register, I2C I/O expander,
//!   `embedded-hal` output pins

#![no_std]
#![deny(unsafe_code)]

pub mod output;
pub mod step;
