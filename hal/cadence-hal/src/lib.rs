//! Cadence Hardware Abstraction Layer
//!
//! This crate defines the hardware primitives the motion core consumes.
//! Chip-specific HALs (RP2040 today) implement them; the core and the
//! backend drivers only ever see these traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  cadence-firmware                       │
//! └─────────────────────────────────────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌─────────────────┐   ┌─────────────────┐
//! │  cadence-core   │◄──│ cadence-drivers │
//! └─────────────────┘   └─────────────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌─────────────────────────────────────────┐
//! │  cadence-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!          ┌─────────────────────┐
//!          │ cadence-hal-rp2040  │
//!          └─────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::GpioPort`] - Digital I/O
//! - [`irq::PinInterrupts`] - Per-pin interrupt trigger control
//! - [`timer::TickTimer`], [`timer::MicrosClock`] - Step cadence and time base
//! - [`pwm::PwmChannel`] - PWM outputs (spindle, analog aux)
//! - [`adc::AnalogInput`] - ADC reads
//! - [`shift::StepSequencer`], [`shift::ShiftRegister`], [`shift::IoExpander`] -
//!   Serialised output peripherals

#![no_std]
#![deny(unsafe_code)]

pub mod adc;
pub mod error;
pub mod gpio;
pub mod irq;
pub mod pwm;
pub mod shift;
pub mod timer;

// Re-export key traits at crate root for convenience
pub use adc::AnalogInput;
pub use error::{HalError, HalResult};
pub use gpio::{GpioPort, Pull};
pub use irq::{IrqMode, PinInterrupts};
pub use pwm::{PwmChannel, PwmTiming};
pub use shift::{IoExpander, ShiftRegister, StepSequencer};
pub use timer::{MicrosClock, TickTimer};
