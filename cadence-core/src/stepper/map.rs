//! Motor output map
//!
//! Resolves each (axis, motor) to the physical step and direction pin once
//! at startup, so backends translate axis bits to port words with a table
//! lookup.

use crate::config::ConfigError;
use crate::signals::{Axis, AxisMask, Motor, PinFunction, PortKind, SignalTable, N_AXIS};

use super::MotorBits;

/// Step/dir pin numbers per axis and motor bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorMap {
    step: [[Option<u8>; 2]; N_AXIS],
    dir: [[Option<u8>; 2]; N_AXIS],
    step_port: PortKind,
    dir_port: PortKind,
}

const fn bank(motor: Motor) -> usize {
    match motor {
        Motor::Primary => 0,
        Motor::Secondary => 1,
    }
}

impl MotorMap {
    /// Collect step/dir outputs from the signal table
    ///
    /// All step outputs must share one port, as must all direction outputs.
    /// Every step output needs a matching direction output.
    pub fn from_table(table: &SignalTable) -> Result<Self, ConfigError> {
        let mut map = Self::default();
        let mut step_port = None;
        let mut dir_port = None;

        for out in table.outputs() {
            let (slot, port) = match out.function {
                PinFunction::Step(axis, motor) => {
                    (&mut map.step[axis.index()][bank(motor)], &mut step_port)
                }
                PinFunction::Dir(axis, motor) => {
                    (&mut map.dir[axis.index()][bank(motor)], &mut dir_port)
                }
                _ => continue,
            };
            match *port {
                None => *port = Some(out.port),
                Some(p) if p != out.port => return Err(ConfigError::UnsupportedPort(out.function)),
                Some(_) => {}
            }
            *slot = Some(out.pin);
        }

        for axis in Axis::ALL {
            for motor in [Motor::Primary, Motor::Secondary] {
                let b = bank(motor);
                if map.step[axis.index()][b].is_some() && map.dir[axis.index()][b].is_none() {
                    return Err(ConfigError::MissingPin(PinFunction::Dir(axis, motor)));
                }
            }
        }

        map.step_port = step_port.unwrap_or_default();
        map.dir_port = dir_port.unwrap_or_default();
        Ok(map)
    }

    pub fn step_pin(&self, axis: Axis, motor: Motor) -> Option<u8> {
        self.step[axis.index()][bank(motor)]
    }

    pub fn dir_pin(&self, axis: Axis, motor: Motor) -> Option<u8> {
        self.dir[axis.index()][bank(motor)]
    }

    pub fn step_port(&self) -> PortKind {
        self.step_port
    }

    pub fn dir_port(&self) -> PortKind {
        self.dir_port
    }

    /// Axes with a step output
    pub fn axes(&self) -> AxisMask {
        Axis::ALL
            .into_iter()
            .filter(|a| self.step[a.index()][0].is_some())
            .fold(AxisMask::NONE, |m, a| m | a.mask())
    }

    /// Axes driven by two motors
    pub fn ganged(&self) -> AxisMask {
        Axis::ALL
            .into_iter()
            .filter(|a| self.step[a.index()][1].is_some())
            .fold(AxisMask::NONE, |m, a| m | a.mask())
    }

    fn word(pins: &[[Option<u8>; 2]; N_AXIS], bits: MotorBits, axes: AxisMask) -> (u32, u32) {
        let mut mask = 0u32;
        let mut value = 0u32;
        for axis in axes.iter() {
            let levels = [bits.primary.contains(axis), bits.secondary.contains(axis)];
            for (pin, high) in pins[axis.index()].iter().zip(levels) {
                if let Some(pin) = *pin {
                    mask |= 1 << pin;
                    if high {
                        value |= 1 << pin;
                    }
                }
            }
        }
        (mask, value)
    }

    /// Port mask and value for step levels on every axis
    pub fn step_word(&self, bits: MotorBits) -> (u32, u32) {
        Self::word(&self.step, bits, AxisMask::ALL)
    }

    /// Port mask and value for direction levels on `axes`
    pub fn dir_word(&self, bits: MotorBits, axes: AxisMask) -> (u32, u32) {
        Self::word(&self.dir, bits, axes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::BoardPin;

    fn gantry() -> SignalTable {
        SignalTable::from_board(&[
            BoardPin::gpio(PinFunction::Step(Axis::X, Motor::Primary), 2),
            BoardPin::gpio(PinFunction::Step(Axis::Y, Motor::Primary), 3),
            BoardPin::gpio(PinFunction::Step(Axis::X, Motor::Secondary), 4),
            BoardPin::gpio(PinFunction::Dir(Axis::X, Motor::Primary), 5),
            BoardPin::gpio(PinFunction::Dir(Axis::Y, Motor::Primary), 6),
            BoardPin::gpio(PinFunction::Dir(Axis::X, Motor::Secondary), 7),
        ])
        .unwrap()
    }

    #[test]
    fn test_ganged_axes() {
        let map = MotorMap::from_table(&gantry()).unwrap();
        assert_eq!(map.axes(), AxisMask::X | AxisMask::Y);
        assert_eq!(map.ganged(), AxisMask::X);
        assert_eq!(map.step_pin(Axis::X, Motor::Secondary), Some(4));
    }

    #[test]
    fn test_step_word_per_bank() {
        let map = MotorMap::from_table(&gantry()).unwrap();
        let bits = MotorBits {
            primary: AxisMask::X | AxisMask::Y,
            secondary: AxisMask::NONE,
        };
        let (mask, value) = map.step_word(bits);
        assert_eq!(mask, (1 << 2) | (1 << 3) | (1 << 4));
        assert_eq!(value, (1 << 2) | (1 << 3));
    }

    #[test]
    fn test_dir_word_limited_to_axes() {
        let map = MotorMap::from_table(&gantry()).unwrap();
        let (mask, value) = map.dir_word(MotorBits::splat(AxisMask::ALL), AxisMask::Y);
        assert_eq!(mask, 1 << 6);
        assert_eq!(value, 1 << 6);
    }

    #[test]
    fn test_missing_dir_rejected() {
        let table = SignalTable::from_board(&[BoardPin::gpio(
            PinFunction::Step(Axis::Z, Motor::Primary),
            8,
        )])
        .unwrap();
        assert_eq!(
            MotorMap::from_table(&table),
            Err(ConfigError::MissingPin(PinFunction::Dir(Axis::Z, Motor::Primary)))
        );
    }
}
