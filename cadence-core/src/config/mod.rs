//! Configuration types
//!
//! Driver settings threaded explicitly through component constructors, and
//! the error raised when a board or settings combination cannot run.

pub mod settings;

pub use settings::*;

use core::fmt;

use crate::signals::PinFunction;

/// Fatal configuration problems, detected before stepping starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Two entries claim the same physical pin
    DuplicatePin(u8),
    /// A required function has no pin in the table
    MissingPin(PinFunction),
    /// Function cannot live on the requested port
    UnsupportedPort(PinFunction),
    /// Aux port already claimed by another function
    AlreadyClaimed(PinFunction),
    /// Signal table or a backend map has no room left
    TableFull,
    /// Pulse timing out of range for the step backend
    InvalidTiming,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicatePin(pin) => write!(f, "pin {} assigned twice", pin),
            Self::MissingPin(func) => write!(f, "no pin for {}", func),
            Self::UnsupportedPort(func) => write!(f, "{} not supported on this port", func),
            Self::AlreadyClaimed(func) => write!(f, "{} already claimed", func),
            Self::TableFull => write!(f, "signal table full"),
            Self::InvalidTiming => write!(f, "step pulse timing out of range"),
        }
    }
}
