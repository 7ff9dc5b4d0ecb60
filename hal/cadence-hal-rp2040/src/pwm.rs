//! PWM channels (spindle, analog aux outputs)

use embassy_rp::pwm::{Config, Pwm};
use fixed::traits::ToFixed;

use cadence_hal::{HalError, HalResult, PwmChannel, PwmTiming};

/// Which output of the slice the pin is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SliceOutput {
    A,
    B,
}

impl SliceOutput {
    /// Even GPIOs are output A, odd ones output B
    pub const fn for_pin(pin: u8) -> Self {
        if pin % 2 == 0 {
            Self::A
        } else {
            Self::B
        }
    }
}

/// One PWM output of a slice
pub struct RpPwm<'d> {
    pwm: Pwm<'d>,
    output: SliceOutput,
    config: Config,
    level: u32,
}

impl<'d> RpPwm<'d> {
    /// Wrap a slice created with `Pwm::new_output_a` or `new_output_b`
    pub fn new(pwm: Pwm<'d>, output: SliceOutput) -> Self {
        Self {
            pwm,
            output,
            config: Config::default(),
            level: 0,
        }
    }

    fn apply(&mut self) {
        self.pwm.set_config(&self.config);
    }
}

impl PwmChannel for RpPwm<'_> {
    fn configure(&mut self, timing: PwmTiming) -> HalResult<()> {
        if timing.period < 2 || timing.period > 0x1_0000 {
            return Err(HalError::InvalidParameter);
        }
        let prescaler = u8::try_from(timing.prescaler).map_err(|_| HalError::InvalidParameter)?;
        if prescaler == 0 {
            return Err(HalError::InvalidParameter);
        }
        self.config.divider = prescaler.to_fixed();
        self.config.top = (timing.period - 1) as u16;
        match self.output {
            SliceOutput::A => self.config.invert_a = timing.invert,
            SliceOutput::B => self.config.invert_b = timing.invert,
        }
        self.level = 0;
        self.config.compare_a = 0;
        self.config.compare_b = 0;
        self.config.enable = true;
        self.apply();
        Ok(())
    }

    #[inline]
    fn set_level(&mut self, level: u32) {
        let level = level.min(u32::from(self.config.top) + 1);
        let compare = level.min(0xFFFF) as u16;
        match self.output {
            SliceOutput::A => self.config.compare_a = compare,
            SliceOutput::B => self.config.compare_b = compare,
        }
        self.level = level;
        self.apply();
    }

    fn level(&self) -> u32 {
        self.level
    }
}
