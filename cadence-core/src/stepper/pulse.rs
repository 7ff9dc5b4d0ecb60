//! Pulse generator
//!
//! Applies inversion, ganging and squaring masks to logical step/dir bits
//! and hands the physical levels to the active [`StepBackend`]. Pulse
//! timing is converted once per settings change, never per pulse.

use crate::config::{ConfigError, StepperSettings};
use crate::signals::AxisMask;

use super::{MotorBits, PulseTiming, SquaringMode, StepBackend, StepCommand};

/// Step/dir output driver
pub struct PulseGenerator<B: StepBackend> {
    backend: B,
    settings: StepperSettings,
    /// Axes with a second motor
    ganged: AxisMask,
    /// Bank 1 step enable mask (squaring)
    motors_1: AxisMask,
    /// Bank 2 step enable mask (squaring)
    motors_2: AxisMask,
    timing: PulseTiming,
}

impl<B: StepBackend> PulseGenerator<B> {
    /// Create a generator and program the backend
    ///
    /// # Arguments
    /// - `ganged`: axes driven by two motors (see `MotorMap::ganged`)
    pub fn new(backend: B, settings: &StepperSettings, ganged: AxisMask) -> Result<Self, ConfigError> {
        let mut gen = Self {
            backend,
            settings: *settings,
            ganged,
            motors_1: AxisMask::ALL,
            motors_2: AxisMask::ALL,
            timing: PulseTiming::default(),
        };
        gen.configure(settings)?;
        Ok(gen)
    }

    /// Apply new settings: convert timing, program idle levels, reset outputs
    ///
    /// On error the previous settings stay in effect.
    pub fn configure(&mut self, settings: &StepperSettings) -> Result<(), ConfigError> {
        let timing =
            PulseTiming::for_port(self.backend.port(), settings.pulse_us, settings.pulse_delay_us)?;
        self.settings = *settings;
        self.timing = timing;
        self.backend
            .configure(timing, MotorBits::splat(settings.step_invert));
        self.set_step_outputs(AxisMask::NONE);
        self.set_dir_outputs(AxisMask::NONE);
        Ok(())
    }

    /// Assert step outputs for `step` on both banks
    #[inline]
    pub fn set_step_outputs(&mut self, step: AxisMask) {
        let invert = self.settings.step_invert;
        self.backend.write_step(MotorBits {
            primary: (step & self.motors_1) ^ invert,
            secondary: (step & self.motors_2) ^ invert,
        });
    }

    fn dir_bits(&self, dir: AxisMask) -> MotorBits {
        let primary = dir ^ self.settings.dir_invert;
        MotorBits {
            primary,
            secondary: primary ^ self.settings.ganged_dir_invert,
        }
    }

    /// Write direction outputs for every axis
    #[inline]
    pub fn set_dir_outputs(&mut self, dir: AxisMask) {
        let bits = self.dir_bits(dir);
        self.backend.write_dir(bits, AxisMask::ALL);
    }

    /// Direction first if changed, then the step pulse
    #[inline]
    pub fn pulse_start(&mut self, cmd: &StepCommand) {
        if cmd.dir_changed {
            self.set_dir_outputs(cmd.dir);
        }
        if !cmd.step.is_empty() {
            self.set_step_outputs(cmd.step);
        }
    }

    /// Inject a step outside the planner's stream
    ///
    /// Only the stepping axes get their direction rewritten, so steps
    /// injected during motion do not disturb the other axes.
    pub fn output_step(&mut self, step: AxisMask, dir: AxisMask) {
        if step.is_empty() {
            return;
        }
        let bits = self.dir_bits(dir);
        self.backend.write_dir(bits, step);
        self.set_step_outputs(step);
    }

    /// End the current pulse (software-timed backends)
    #[inline]
    pub fn on_pulse_end(&mut self) {
        self.backend.end_pulse();
    }

    /// Hold one or both motors of `axes` for squaring
    ///
    /// `disable_motors(AxisMask::NONE, SquaringMode::Both)` releases all.
    pub fn disable_motors(&mut self, axes: AxisMask, mode: SquaringMode) {
        let hold_a = matches!(mode, SquaringMode::A | SquaringMode::Both);
        let hold_b = matches!(mode, SquaringMode::B | SquaringMode::Both);
        self.motors_1 = (if hold_a { axes } else { AxisMask::NONE }) ^ AxisMask::ALL;
        self.motors_2 = (if hold_b { axes } else { AxisMask::NONE }) ^ AxisMask::ALL;
    }

    /// Ganged axes, or only those set up for auto-squaring
    pub fn ganged(&self, auto_squared: bool) -> AxisMask {
        if auto_squared {
            self.ganged & self.settings.auto_square
        } else {
            self.ganged
        }
    }

    pub fn timing(&self) -> PulseTiming {
        self.timing
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::PortKind;
    use proptest::prelude::*;

    /// Backend that records the last levels written
    #[derive(Default)]
    struct MockBackend {
        timing: PulseTiming,
        idle: MotorBits,
        step: MotorBits,
        dir: MotorBits,
        dir_axes: AxisMask,
        step_writes: u32,
        dir_writes: u32,
        pulse_ends: u32,
    }

    impl StepBackend for MockBackend {
        fn port(&self) -> PortKind {
            PortKind::Sequencer
        }

        fn configure(&mut self, timing: PulseTiming, idle: MotorBits) {
            self.timing = timing;
            self.idle = idle;
        }

        fn write_dir(&mut self, dir: MotorBits, axes: AxisMask) {
            self.dir.primary = (self.dir.primary & !axes) | (dir.primary & axes);
            self.dir.secondary = (self.dir.secondary & !axes) | (dir.secondary & axes);
            self.dir_axes = axes;
            self.dir_writes += 1;
        }

        fn write_step(&mut self, step: MotorBits) {
            self.step = step;
            self.step_writes += 1;
        }

        fn end_pulse(&mut self) {
            self.pulse_ends += 1;
        }
    }

    fn settings() -> StepperSettings {
        StepperSettings {
            pulse_us: 2.0,
            ..Default::default()
        }
    }

    fn generator(settings: &StepperSettings) -> PulseGenerator<MockBackend> {
        PulseGenerator::new(MockBackend::default(), settings, AxisMask::X).unwrap()
    }

    #[test]
    fn test_configure_programs_backend() {
        let mut s = settings();
        s.step_invert = AxisMask::Y;
        let gen = generator(&s);
        assert_eq!(gen.backend().timing, PulseTiming { delay: 1, length: 19 });
        assert_eq!(gen.backend().idle, MotorBits::splat(AxisMask::Y));
        // Outputs reset to idle
        assert_eq!(gen.backend().step.primary, AxisMask::Y);
    }

    #[test]
    fn test_invalid_timing_keeps_previous() {
        let mut gen = generator(&settings());
        let mut bad = settings();
        bad.pulse_us = 40.0;
        assert_eq!(gen.configure(&bad), Err(ConfigError::InvalidTiming));
        assert_eq!(gen.timing().length, 19);
    }

    #[test]
    fn test_dir_before_step_only_when_changed() {
        let mut gen = generator(&settings());
        let writes = gen.backend().dir_writes;
        gen.pulse_start(&StepCommand {
            step: AxisMask::X,
            dir: AxisMask::X,
            dir_changed: false,
        });
        assert_eq!(gen.backend().dir_writes, writes);
        gen.pulse_start(&StepCommand {
            step: AxisMask::NONE,
            dir: AxisMask::X,
            dir_changed: true,
        });
        assert_eq!(gen.backend().dir_writes, writes + 1);
        assert_eq!(gen.backend().dir.primary, AxisMask::X);
        // Empty step mask does not pulse
        assert_eq!(gen.backend().step_writes, 2);
    }

    #[test]
    fn test_ganged_dir_invert_on_second_bank() {
        let mut s = settings();
        s.dir_invert = AxisMask::Z;
        s.ganged_dir_invert = AxisMask::X;
        let mut gen = generator(&s);
        gen.set_dir_outputs(AxisMask::X);
        assert_eq!(gen.backend().dir.primary, AxisMask::X | AxisMask::Z);
        assert_eq!(gen.backend().dir.secondary, AxisMask::Z);
    }

    #[test]
    fn test_squaring_runs_only_motor_a() {
        let mut gen = generator(&settings());
        // Hold bank 2 so only motor A of X steps
        gen.disable_motors(AxisMask::X, SquaringMode::B);
        gen.set_step_outputs(AxisMask::X);
        assert!(gen.backend().step.primary.contains(crate::signals::Axis::X));
        assert!(!gen.backend().step.secondary.contains(crate::signals::Axis::X));
    }

    #[test]
    fn test_squaring_mode_a_holds_bank_1() {
        let mut gen = generator(&settings());
        gen.disable_motors(AxisMask::X, SquaringMode::A);
        gen.set_step_outputs(AxisMask::X | AxisMask::Y);
        assert_eq!(gen.backend().step.primary, AxisMask::Y);
        assert_eq!(gen.backend().step.secondary, AxisMask::X | AxisMask::Y);

        gen.disable_motors(AxisMask::NONE, SquaringMode::Both);
        gen.set_step_outputs(AxisMask::X);
        assert_eq!(gen.backend().step, MotorBits::splat(AxisMask::X));
    }

    #[test]
    fn test_output_step_sets_dir_for_stepping_axes_only() {
        let mut gen = generator(&settings());
        gen.set_dir_outputs(AxisMask::Y);
        gen.output_step(AxisMask::X, AxisMask::X);
        assert_eq!(gen.backend().dir_axes, AxisMask::X);
        assert_eq!(gen.backend().dir.primary, AxisMask::X | AxisMask::Y);
        assert_eq!(gen.backend().step.primary, AxisMask::X);

        let steps = gen.backend().step_writes;
        gen.output_step(AxisMask::NONE, AxisMask::ALL);
        assert_eq!(gen.backend().step_writes, steps);
    }

    #[test]
    fn test_ganged_auto_squared() {
        let mut s = settings();
        s.auto_square = AxisMask::X | AxisMask::Y;
        let gen = generator(&s);
        assert_eq!(gen.ganged(false), AxisMask::X);
        assert_eq!(gen.ganged(true), AxisMask::X);

        let gen = generator(&settings());
        assert_eq!(gen.ganged(true), AxisMask::NONE);
    }

    #[test]
    fn test_pulse_end_forwarded() {
        let mut gen = generator(&settings());
        gen.on_pulse_end();
        assert_eq!(gen.backend().pulse_ends, 1);
    }

    proptest! {
        #[test]
        fn prop_step_outputs_are_bits_xor_invert(bits in 0u8..64, invert in 0u8..64) {
            let mut s = settings();
            s.step_invert = AxisMask(invert);
            let mut gen = generator(&s);
            gen.set_step_outputs(AxisMask(bits));
            prop_assert_eq!(gen.backend().step.primary, AxisMask(bits ^ invert));
        }

        #[test]
        fn prop_dir_outputs_are_bits_xor_invert(bits in 0u8..64, invert in 0u8..64) {
            let mut s = settings();
            s.dir_invert = AxisMask(invert);
            let mut gen = generator(&s);
            gen.set_dir_outputs(AxisMask(bits));
            prop_assert_eq!(gen.backend().dir.primary, AxisMask(bits ^ invert));
        }
    }
}
