//! 8-bit shift register step backend
//!
//! Step and direction outputs share one 8-bit register. Each pulse shifts
//! out a 16-bit frame: the low byte is latched for the pulse, the high byte
//! after it, so the register itself ends the pulse.

use cadence_core::config::ConfigError;
use cadence_core::signals::{Axis, AxisMask, Motor, PinFunction, PortKind};
use cadence_core::stepper::{MotorBits, MotorMap, PulseTiming, StepBackend};
use cadence_hal::ShiftRegister;

/// Outputs per register
const REGISTER_BITS: u8 = 8;

pub struct ShiftStepBackend<R> {
    register: R,
    map: MotorMap,
    dir_bits: u8,
    idle_bits: u8,
}

impl<R: ShiftRegister> ShiftStepBackend<R> {
    /// Step and direction outputs must all sit on the register
    pub fn new(register: R, map: MotorMap) -> Result<Self, ConfigError> {
        if map.step_port() != PortKind::ShiftRegister8 {
            return Err(ConfigError::UnsupportedPort(PinFunction::Step(
                Axis::X,
                Motor::Primary,
            )));
        }
        if map.dir_port() != PortKind::ShiftRegister8 {
            return Err(ConfigError::UnsupportedPort(PinFunction::Dir(
                Axis::X,
                Motor::Primary,
            )));
        }
        for axis in Axis::ALL {
            for motor in [Motor::Primary, Motor::Secondary] {
                if map.step_pin(axis, motor).is_some_and(|p| p >= REGISTER_BITS) {
                    return Err(ConfigError::UnsupportedPort(PinFunction::Step(axis, motor)));
                }
                if map.dir_pin(axis, motor).is_some_and(|p| p >= REGISTER_BITS) {
                    return Err(ConfigError::UnsupportedPort(PinFunction::Dir(axis, motor)));
                }
            }
        }
        Ok(Self {
            register,
            map,
            dir_bits: 0,
            idle_bits: 0,
        })
    }

    fn step_bits(&self, levels: MotorBits) -> u8 {
        self.map.step_word(levels).1 as u8
    }

    fn shift_out(&mut self, step: u8) {
        let set = self.dir_bits | step;
        let reset = self.dir_bits | self.idle_bits;
        self.register.write(u32::from(set) | u32::from(reset) << 8);
    }

    pub fn register(&self) -> &R {
        &self.register
    }
}

impl<R: ShiftRegister> StepBackend for ShiftStepBackend<R> {
    fn port(&self) -> PortKind {
        PortKind::ShiftRegister8
    }

    fn configure(&mut self, timing: PulseTiming, idle: MotorBits) {
        self.register
            .set_timing(u32::from(timing.delay), u32::from(timing.length));
        self.idle_bits = self.step_bits(idle);
        self.shift_out(self.idle_bits);
    }

    fn write_dir(&mut self, dir: MotorBits, axes: AxisMask) {
        let (mask, value) = self.map.dir_word(dir, axes);
        self.dir_bits = (self.dir_bits & !(mask as u8)) | (value & mask) as u8;
        self.shift_out(self.idle_bits);
    }

    #[inline]
    fn write_step(&mut self, step: MotorBits) {
        let bits = self.step_bits(step);
        self.shift_out(bits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::config::StepperSettings;
    use cadence_core::signals::{BoardPin, SignalTable};
    use cadence_core::stepper::PulseGenerator;

    #[derive(Default)]
    struct MockRegister {
        frame: u32,
        writes: u32,
        timing: (u32, u32),
    }

    impl ShiftRegister for MockRegister {
        fn write(&mut self, value: u32) {
            self.frame = value;
            self.writes += 1;
        }

        fn set_timing(&mut self, delay: u32, hold: u32) {
            self.timing = (delay, hold);
        }
    }

    fn sr(function: PinFunction, pin: u8) -> BoardPin {
        BoardPin {
            function,
            port: PortKind::ShiftRegister8,
            pin,
        }
    }

    fn map() -> MotorMap {
        let table = SignalTable::from_board(&[
            sr(PinFunction::Step(Axis::X, Motor::Primary), 0),
            sr(PinFunction::Step(Axis::Y, Motor::Primary), 1),
            sr(PinFunction::Dir(Axis::X, Motor::Primary), 4),
            sr(PinFunction::Dir(Axis::Y, Motor::Primary), 5),
        ])
        .unwrap();
        MotorMap::from_table(&table).unwrap()
    }

    #[test]
    fn test_frame_holds_dir_through_pulse() {
        let backend = ShiftStepBackend::new(MockRegister::default(), map()).unwrap();
        let settings = StepperSettings {
            pulse_us: 4.8,
            ..Default::default()
        };
        let mut gen = PulseGenerator::new(backend, &settings, AxisMask::NONE).unwrap();
        assert_eq!(gen.backend().register().timing, (2, 40));

        gen.set_dir_outputs(AxisMask::Y);
        gen.set_step_outputs(AxisMask::X | AxisMask::Y);
        let frame = gen.backend().register().frame;
        assert_eq!(frame & 0xff, 0b0010_0011);
        assert_eq!(frame >> 8, 0b0010_0000);
    }

    #[test]
    fn test_inverted_step_idles_high() {
        let backend = ShiftStepBackend::new(MockRegister::default(), map()).unwrap();
        let settings = StepperSettings {
            pulse_us: 4.8,
            step_invert: AxisMask::X,
            ..Default::default()
        };
        let mut gen = PulseGenerator::new(backend, &settings, AxisMask::NONE).unwrap();
        gen.set_step_outputs(AxisMask::X);
        let frame = gen.backend().register().frame;
        assert_eq!(frame & 0xff, 0b0000_0000);
        assert_eq!(frame >> 8, 0b0000_0001);
    }

    #[test]
    fn test_pin_beyond_register_rejected() {
        let table = SignalTable::from_board(&[
            sr(PinFunction::Step(Axis::X, Motor::Primary), 0),
            sr(PinFunction::Dir(Axis::X, Motor::Primary), 9),
        ])
        .unwrap();
        let map = MotorMap::from_table(&table).unwrap();
        assert_eq!(
            ShiftStepBackend::new(MockRegister::default(), map).err(),
            Some(ConfigError::UnsupportedPort(PinFunction::Dir(
                Axis::X,
                Motor::Primary
            )))
        );
    }
}
