//! Board-agnostic motion core for the CNC controller firmware
//!
//! This crate contains the real-time logic that sits between the motion
//! planner and the physical I/O, with no dependency on a particular chip:
//!
//! - Signal table mapping logical pins to physical ports
//! - Step pulse generation with ganged/squared axes
//! - Stepper tick timer state machine
//! - Input interrupt classification, debounce and latch protocols
//! - Peripheral façade (stepper enable, spindle, coolant, aux ports)
//! - Driver settings and the event queue handed to the planner

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod config;
pub mod events;
pub mod input;
pub mod periph;
pub mod signals;
pub mod stepper;
