//! Step pulse generation
//!
//! The planner hands over one [`StepCommand`] per timer tick. The
//! [`PulseGenerator`] turns it into physical step/dir levels for both motor
//! banks and writes them through a [`StepBackend`]. The [`StepperTimer`]
//! paces the ticks.

pub mod control;
pub mod map;
pub mod pulse;
pub mod timer;

pub use control::{StepperCommand, StepperControl};
pub use map::MotorMap;
pub use pulse::PulseGenerator;
pub use timer::{StepperTimer, TimerState, MAX_CYCLES_PER_TICK};

use crate::config::ConfigError;
use crate::signals::{AxisMask, PortKind};

/// Step request for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepCommand {
    pub step: AxisMask,
    pub dir: AxisMask,
    /// Direction outputs must be rewritten before stepping
    pub dir_changed: bool,
}

/// Source of step commands, called once per tick
pub trait StepSource {
    fn next_step(&mut self) -> Option<StepCommand>;
}

/// Stepper driver enable outputs
pub trait EnableSteppers {
    /// Enable drivers for `axes`, disable the rest
    fn enable_steppers(&mut self, axes: AxisMask);
}

/// Which motor bank of the ganged axes is held during squaring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SquaringMode {
    /// Hold both motors
    #[default]
    Both,
    /// Hold motor A (bank 1), B keeps stepping
    A,
    /// Hold motor B (bank 2), A keeps stepping
    B,
}

/// Physical levels for both motor banks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorBits {
    /// Bank 1, every axis
    pub primary: AxisMask,
    /// Bank 2, second motor of ganged axes
    pub secondary: AxisMask,
}

impl MotorBits {
    /// Same bits on both banks
    pub const fn splat(bits: AxisMask) -> Self {
        Self {
            primary: bits,
            secondary: bits,
        }
    }
}

/// Step pulse timing in 0.1 µs units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseTiming {
    /// Delay from direction setup to step assertion
    pub delay: u8,
    /// Step pulse length
    pub length: u8,
}

/// Tenths of a microsecond, rounded to nearest
fn tenths(us: f32) -> Result<u8, ConfigError> {
    let t = 10.0 * us + 0.5;
    if !(0.0..256.0).contains(&t) {
        return Err(ConfigError::InvalidTiming);
    }
    Ok(t as u8)
}

impl PulseTiming {
    /// Convert pulse width and delay for the given step port
    ///
    /// The sequencer adds one unit per phase, the shift register adds
    /// 0.8 µs of shift-out time; both are compensated here.
    pub fn for_port(port: PortKind, pulse_us: f32, delay_us: f32) -> Result<Self, ConfigError> {
        match port {
            PortKind::Sequencer => {
                let length = tenths(pulse_us)?;
                if length == 0 {
                    return Err(ConfigError::InvalidTiming);
                }
                let delay = if delay_us == 0.0 {
                    1
                } else {
                    tenths(delay_us)?.saturating_sub(1).max(1)
                };
                Ok(Self {
                    delay,
                    length: length - 1,
                })
            }
            PortKind::ShiftRegister8 => {
                if pulse_us <= 0.8 {
                    return Err(ConfigError::InvalidTiming);
                }
                let length = tenths(pulse_us - 0.8)?;
                let delay = if delay_us <= 0.8 {
                    2
                } else {
                    tenths(delay_us - 0.8)?
                };
                Ok(Self { delay, length })
            }
            PortKind::Gpio => Ok(Self {
                delay: tenths(delay_us)?,
                length: tenths(pulse_us)?.max(1),
            }),
            _ => Err(ConfigError::InvalidTiming),
        }
    }

    /// Pulse length in whole microseconds, at least one
    pub fn length_us(&self) -> u32 {
        (u32::from(self.length) / 10).max(1)
    }

    /// Delay in whole microseconds
    pub fn delay_us(&self) -> u32 {
        u32::from(self.delay) / 10
    }
}

/// Physical step/dir output
///
/// Implementations must be bounded and non-blocking; they run from the
/// step interrupt.
pub trait StepBackend {
    /// Port the step outputs are on
    fn port(&self) -> PortKind;

    /// Program pulse timing and the idle (de-asserted) step levels
    fn configure(&mut self, timing: PulseTiming, idle: MotorBits);

    /// Write direction levels for `axes`, leaving other axes unchanged
    fn write_dir(&mut self, dir: MotorBits, axes: AxisMask);

    /// Start a step pulse with the given asserted levels
    fn write_step(&mut self, step: MotorBits);

    /// End the pulse started by `write_step`
    ///
    /// Only software-timed backends need this; hardware sequencers end the
    /// pulse on their own.
    fn end_pulse(&mut self) {}
}
