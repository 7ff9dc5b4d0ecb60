//! Direct GPIO step backend
//!
//! Step and direction pins are plain GPIO outputs written as one masked
//! port word. The pulse is timed in software: the caller schedules
//! `end_pulse` after [`PulseTiming::length_us`].

use cadence_core::config::ConfigError;
use cadence_core::signals::{Axis, AxisMask, Motor, PinFunction, PortKind};
use cadence_core::stepper::{MotorBits, MotorMap, PulseTiming, StepBackend};
use cadence_hal::GpioPort;

pub struct GpioStepBackend<G> {
    gpio: G,
    map: MotorMap,
    idle: MotorBits,
    timing: PulseTiming,
}

impl<G: GpioPort> GpioStepBackend<G> {
    /// Both step and direction outputs must be on GPIO
    pub fn new(gpio: G, map: MotorMap) -> Result<Self, ConfigError> {
        if map.step_port() != PortKind::Gpio {
            return Err(ConfigError::UnsupportedPort(PinFunction::Step(
                Axis::X,
                Motor::Primary,
            )));
        }
        if map.dir_port() != PortKind::Gpio {
            return Err(ConfigError::UnsupportedPort(PinFunction::Dir(
                Axis::X,
                Motor::Primary,
            )));
        }
        Ok(Self {
            gpio,
            map,
            idle: MotorBits::default(),
            timing: PulseTiming::default(),
        })
    }

    pub fn timing(&self) -> PulseTiming {
        self.timing
    }

    pub fn gpio(&self) -> &G {
        &self.gpio
    }
}

impl<G: GpioPort> StepBackend for GpioStepBackend<G> {
    fn port(&self) -> PortKind {
        PortKind::Gpio
    }

    fn configure(&mut self, timing: PulseTiming, idle: MotorBits) {
        self.timing = timing;
        self.idle = idle;
        let (mask, value) = self.map.step_word(idle);
        self.gpio.write_masked(mask, value);
    }

    #[inline]
    fn write_dir(&mut self, dir: MotorBits, axes: AxisMask) {
        let (mask, value) = self.map.dir_word(dir, axes);
        self.gpio.write_masked(mask, value);
    }

    #[inline]
    fn write_step(&mut self, step: MotorBits) {
        let (mask, value) = self.map.step_word(step);
        self.gpio.write_masked(mask, value);
    }

    #[inline]
    fn end_pulse(&mut self) {
        let (mask, value) = self.map.step_word(self.idle);
        self.gpio.write_masked(mask, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::config::StepperSettings;
    use cadence_core::signals::{BoardPin, SignalTable};
    use cadence_core::stepper::PulseGenerator;
    use cadence_hal::gpio::Pull;

    #[derive(Default)]
    struct MockPort {
        out: u32,
    }

    impl GpioPort for MockPort {
        fn read(&self) -> u32 {
            self.out
        }

        fn write_masked(&mut self, mask: u32, value: u32) {
            self.out = (self.out & !mask) | (value & mask);
        }

        fn output_state(&self) -> u32 {
            self.out
        }

        fn set_pull(&mut self, _pin: u8, _pull: Pull) {}
    }

    fn map() -> MotorMap {
        let table = SignalTable::from_board(&[
            BoardPin::gpio(PinFunction::Step(Axis::X, Motor::Primary), 2),
            BoardPin::gpio(PinFunction::Step(Axis::Y, Motor::Primary), 3),
            BoardPin::gpio(PinFunction::Dir(Axis::X, Motor::Primary), 5),
            BoardPin::gpio(PinFunction::Dir(Axis::Y, Motor::Primary), 6),
        ])
        .unwrap();
        MotorMap::from_table(&table).unwrap()
    }

    #[test]
    fn test_pulse_and_restore_idle() {
        let settings = StepperSettings {
            step_invert: AxisMask::Y,
            ..Default::default()
        };
        let backend = GpioStepBackend::new(MockPort::default(), map()).unwrap();
        let mut gen = PulseGenerator::new(backend, &settings, AxisMask::NONE).unwrap();
        // Inverted Y idles high
        assert_eq!(gen.backend().gpio().out, 1 << 3);
        assert_eq!(gen.timing().length, 50);

        gen.set_step_outputs(AxisMask::X | AxisMask::Y);
        assert_eq!(gen.backend().gpio().out, 1 << 2);

        gen.on_pulse_end();
        assert_eq!(gen.backend().gpio().out, 1 << 3);
    }

    #[test]
    fn test_dir_only_touches_requested_axes() {
        let mut backend = GpioStepBackend::new(MockPort::default(), map()).unwrap();
        backend.write_dir(MotorBits::splat(AxisMask::X | AxisMask::Y), AxisMask::ALL);
        backend.write_dir(MotorBits::splat(AxisMask::NONE), AxisMask::X);
        assert_eq!(backend.gpio().out, 1 << 6);
    }

    #[test]
    fn test_rejects_sequencer_map() {
        let table = SignalTable::from_board(&[
            BoardPin {
                function: PinFunction::Step(Axis::X, Motor::Primary),
                port: PortKind::Sequencer,
                pin: 2,
            },
            BoardPin::gpio(PinFunction::Dir(Axis::X, Motor::Primary), 5),
        ])
        .unwrap();
        let map = MotorMap::from_table(&table).unwrap();
        assert!(GpioStepBackend::new(MockPort::default(), map).is_err());
    }
}
