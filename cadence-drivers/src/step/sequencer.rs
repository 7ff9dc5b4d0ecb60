//! PIO step sequencer backend
//!
//! All step pins sit in one window of up to [`SEQUENCER_PINS`] consecutive
//! GPIOs driven by a single state machine. Every pulse is one command word;
//! the hardware times delay and length itself. Direction pins stay on GPIO.

use cadence_core::config::ConfigError;
use cadence_core::signals::{Axis, AxisMask, Motor, PinFunction, PortKind};
use cadence_core::stepper::{MotorBits, MotorMap, PulseTiming, StepBackend};
use cadence_hal::{GpioPort, StepSequencer};

/// Width of the sequencer pin window
pub const SEQUENCER_PINS: u8 = 6;

const PIN_MASK: u32 = (1 << SEQUENCER_PINS) - 1;

/// One sequencer command
///
/// Layout: `delay` bits 0-7, `length` bits 8-15, `set` bits 16-21,
/// `reset` bits 22-27.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PioStepWord {
    pub delay: u8,
    pub length: u8,
    /// Pin levels during the pulse
    pub set: u8,
    /// Pin levels after the pulse
    pub reset: u8,
}

impl PioStepWord {
    pub const fn encode(self) -> u32 {
        self.delay as u32
            | (self.length as u32) << 8
            | (self.set as u32 & PIN_MASK) << 16
            | (self.reset as u32 & PIN_MASK) << 22
    }

    pub const fn decode(word: u32) -> Self {
        Self {
            delay: word as u8,
            length: (word >> 8) as u8,
            set: ((word >> 16) & PIN_MASK) as u8,
            reset: ((word >> 22) & PIN_MASK) as u8,
        }
    }
}

pub struct SequencerBackend<S, G> {
    sequencer: S,
    dir_gpio: G,
    map: MotorMap,
    /// First GPIO of the pin window
    base: u8,
    timing: PulseTiming,
    idle: u8,
}

impl<S: StepSequencer, G: GpioPort> SequencerBackend<S, G> {
    /// Step outputs on the sequencer, direction outputs on GPIO
    pub fn new(sequencer: S, dir_gpio: G, map: MotorMap) -> Result<Self, ConfigError> {
        if map.step_port() != PortKind::Sequencer {
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

        let mut base = u8::MAX;
        for axis in Axis::ALL {
            for motor in [Motor::Primary, Motor::Secondary] {
                if let Some(pin) = map.step_pin(axis, motor) {
                    base = base.min(pin);
                }
            }
        }
        for axis in Axis::ALL {
            for motor in [Motor::Primary, Motor::Secondary] {
                if let Some(pin) = map.step_pin(axis, motor) {
                    if pin - base >= SEQUENCER_PINS {
                        return Err(ConfigError::UnsupportedPort(PinFunction::Step(axis, motor)));
                    }
                }
            }
        }

        Ok(Self {
            sequencer,
            dir_gpio,
            map,
            base: if base == u8::MAX { 0 } else { base },
            timing: PulseTiming::default(),
            idle: 0,
        })
    }

    /// Step levels as bits of the pin window
    fn window_bits(&self, levels: MotorBits) -> u8 {
        let (_, value) = self.map.step_word(levels);
        ((value >> self.base) & PIN_MASK) as u8
    }

    pub fn base_pin(&self) -> u8 {
        self.base
    }

    pub fn sequencer(&self) -> &S {
        &self.sequencer
    }

    pub fn dir_gpio(&self) -> &G {
        &self.dir_gpio
    }
}

impl<S: StepSequencer, G: GpioPort> StepBackend for SequencerBackend<S, G> {
    fn port(&self) -> PortKind {
        PortKind::Sequencer
    }

    fn configure(&mut self, timing: PulseTiming, idle: MotorBits) {
        self.timing = timing;
        self.idle = self.window_bits(idle);
        self.sequencer.force_level(u32::from(self.idle));
    }

    #[inline]
    fn write_dir(&mut self, dir: MotorBits, axes: AxisMask) {
        let (mask, value) = self.map.dir_word(dir, axes);
        self.dir_gpio.write_masked(mask, value);
    }

    #[inline]
    fn write_step(&mut self, step: MotorBits) {
        let word = PioStepWord {
            delay: self.timing.delay,
            length: self.timing.length,
            set: self.window_bits(step),
            reset: self.idle,
        };
        self.sequencer.push(word.encode());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::config::StepperSettings;
    use cadence_core::signals::{BoardPin, SignalTable};
    use cadence_core::stepper::{PulseGenerator, SquaringMode};
    use cadence_hal::gpio::Pull;
    use heapless::Vec;

    #[derive(Default)]
    struct MockSequencer {
        words: Vec<u32, 8>,
        level: u32,
    }

    impl StepSequencer for MockSequencer {
        fn push(&mut self, word: u32) {
            let _ = self.words.push(word);
        }

        fn force_level(&mut self, bits: u32) {
            self.level = bits;
        }
    }

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

    fn seq(function: PinFunction, pin: u8) -> BoardPin {
        BoardPin {
            function,
            port: PortKind::Sequencer,
            pin,
        }
    }

    fn gantry_map() -> MotorMap {
        let table = SignalTable::from_board(&[
            seq(PinFunction::Step(Axis::X, Motor::Primary), 2),
            seq(PinFunction::Step(Axis::Y, Motor::Primary), 3),
            seq(PinFunction::Step(Axis::Z, Motor::Primary), 4),
            seq(PinFunction::Step(Axis::X, Motor::Secondary), 5),
            BoardPin::gpio(PinFunction::Dir(Axis::X, Motor::Primary), 10),
            BoardPin::gpio(PinFunction::Dir(Axis::Y, Motor::Primary), 11),
            BoardPin::gpio(PinFunction::Dir(Axis::Z, Motor::Primary), 12),
            BoardPin::gpio(PinFunction::Dir(Axis::X, Motor::Secondary), 13),
        ])
        .unwrap();
        MotorMap::from_table(&table).unwrap()
    }

    #[test]
    fn test_word_layout() {
        let word = PioStepWord {
            delay: 1,
            length: 19,
            set: 0b10_0101,
            reset: 0b00_0010,
        };
        assert_eq!(word.encode(), 1 | 19 << 8 | 0b10_0101 << 16 | 0b10 << 22);
        assert_eq!(PioStepWord::decode(word.encode()), word);
    }

    #[test]
    fn test_pulse_word_from_generator() {
        let backend =
            SequencerBackend::new(MockSequencer::default(), MockPort::default(), gantry_map())
                .unwrap();
        assert_eq!(backend.base_pin(), 2);
        let settings = StepperSettings {
            pulse_us: 2.0,
            step_invert: AxisMask::Z,
            ..Default::default()
        };
        let mut gen = PulseGenerator::new(backend, &settings, AxisMask::X).unwrap();
        assert_eq!(gen.backend().sequencer().level, 0b00_0100);

        gen.set_step_outputs(AxisMask::X);
        let word = PioStepWord::decode(*gen.backend().sequencer().words.last().unwrap());
        assert_eq!(word.delay, 1);
        assert_eq!(word.length, 19);
        // X on both motors, Z stays at its inverted idle level
        assert_eq!(word.set, 0b00_1101);
        assert_eq!(word.reset, 0b00_0100);
    }

    #[test]
    fn test_squared_pulse_skips_held_motor() {
        let backend =
            SequencerBackend::new(MockSequencer::default(), MockPort::default(), gantry_map())
                .unwrap();
        let settings = StepperSettings {
            pulse_us: 2.0,
            ..Default::default()
        };
        let mut gen = PulseGenerator::new(backend, &settings, AxisMask::X).unwrap();
        gen.disable_motors(AxisMask::X, SquaringMode::B);
        gen.set_step_outputs(AxisMask::X);
        let word = PioStepWord::decode(*gen.backend().sequencer().words.last().unwrap());
        assert_eq!(word.set, 0b00_0001);
    }

    #[test]
    fn test_dir_on_gpio() {
        let mut backend =
            SequencerBackend::new(MockSequencer::default(), MockPort::default(), gantry_map())
                .unwrap();
        backend.write_dir(MotorBits::splat(AxisMask::X), AxisMask::ALL);
        assert_eq!(backend.dir_gpio().out, 1 << 10 | 1 << 13);
    }

    #[test]
    fn test_step_pins_outside_window_rejected() {
        let table = SignalTable::from_board(&[
            seq(PinFunction::Step(Axis::X, Motor::Primary), 2),
            seq(PinFunction::Step(Axis::Y, Motor::Primary), 9),
            BoardPin::gpio(PinFunction::Dir(Axis::X, Motor::Primary), 10),
            BoardPin::gpio(PinFunction::Dir(Axis::Y, Motor::Primary), 11),
        ])
        .unwrap();
        let map = MotorMap::from_table(&table).unwrap();
        assert_eq!(
            SequencerBackend::new(MockSequencer::default(), MockPort::default(), map).err(),
            Some(ConfigError::UnsupportedPort(PinFunction::Step(
                Axis::Y,
                Motor::Primary
            )))
        );
    }
}
