//! PWM spindle
//!
//! RPM to compare-level conversion is precomputed into a [`PwmRamp`] on
//! every settings change. Enable and direction pins go through
//! [`Outputs`].

use core::cmp::Ordering;

use heapless::Vec;

use cadence_hal::{HalError, HalResult, PwmChannel, PwmTiming};

use crate::config::{SpindleSettings, MAX_RPM_POINTS};
use crate::signals::SpindleState;

use super::{OutputBackend, Outputs};

/// Precomputed RPM to PWM level mapping
#[derive(Debug, Clone, PartialEq)]
pub struct PwmRamp {
    pub prescaler: u32,
    /// Counter wrap in PWM clock cycles
    pub period: u32,
    pub off_value: u32,
    pub min_value: u32,
    pub max_value: u32,
    /// Off level is non-zero, keep the output running when stopped
    pub always_on: bool,
    pub invert: bool,
    rpm_min: f32,
    rpm_max: f32,
    gradient: f32,
    /// Piecewise curve nodes (rpm, level), empty for a linear ramp
    nodes: Vec<(f32, f32), { MAX_RPM_POINTS + 2 }>,
}

impl PwmRamp {
    /// Clock divider for a PWM frequency
    pub fn prescaler(freq_hz: f32) -> u32 {
        if freq_hz > 2000.0 {
            1
        } else if freq_hz > 200.0 {
            12
        } else {
            50
        }
    }

    /// Precompute levels for `settings` on a PWM block clocked at `clock_hz`
    pub fn compute(settings: &SpindleSettings, clock_hz: u32) -> HalResult<Self> {
        if settings.pwm_freq_hz <= 0.0 || settings.rpm_max <= settings.rpm_min {
            return Err(HalError::InvalidParameter);
        }
        let prescaler = Self::prescaler(settings.pwm_freq_hz);
        let period = ((clock_hz / prescaler) as f32 / settings.pwm_freq_hz) as u32;
        if period < 2 {
            return Err(HalError::InvalidParameter);
        }

        let pf = period as f32;
        let level = |percent: f32| (pf * percent / 100.0) as u32;
        // Polarity is applied by the channel, levels are always active-high
        let off_value = if settings.pwm_off_percent == 0.0 {
            0
        } else {
            level(settings.pwm_off_percent)
        };
        let min_value = level(settings.pwm_min_percent);
        let max_value = level(settings.pwm_max_percent);

        let mut nodes = Vec::new();
        if !settings.rpm_points.is_empty() {
            let mut points = settings.rpm_points.clone();
            points.sort_unstable_by(|a, b| a.rpm.partial_cmp(&b.rpm).unwrap_or(Ordering::Equal));
            // Capacity is MAX_RPM_POINTS + 2, pushes cannot fail
            let _ = nodes.push((settings.rpm_min, min_value as f32));
            for p in points
                .iter()
                .filter(|p| p.rpm > settings.rpm_min && p.rpm < settings.rpm_max)
            {
                let _ = nodes.push((p.rpm, pf * p.duty_percent / 100.0));
            }
            let _ = nodes.push((settings.rpm_max, max_value as f32));
        }

        Ok(Self {
            prescaler,
            period,
            off_value,
            min_value,
            max_value,
            always_on: settings.pwm_off_percent != 0.0,
            invert: settings.invert.pwm,
            rpm_min: settings.rpm_min,
            rpm_max: settings.rpm_max,
            gradient: (max_value as f32 - min_value as f32) / (settings.rpm_max - settings.rpm_min),
            nodes,
        })
    }

    /// Hardware timing for the PWM channel
    pub fn timing(&self) -> PwmTiming {
        PwmTiming {
            prescaler: self.prescaler,
            period: self.period,
            invert: self.invert,
        }
    }

    /// Level for `rpm`
    ///
    /// Zero maps to the off level; anything else at or below `rpm_min`
    /// maps to the minimum level.
    pub fn value(&self, rpm: f32) -> u32 {
        if rpm > self.rpm_min {
            if rpm >= self.rpm_max {
                return self.max_value;
            }
            let level = if self.nodes.is_empty() {
                self.min_value as f32 + (rpm - self.rpm_min) * self.gradient
            } else {
                self.piecewise(rpm)
            };
            (level as u32).max(self.min_value).min(self.max_value)
        } else if rpm == 0.0 {
            self.off_value
        } else {
            self.min_value
        }
    }

    fn piecewise(&self, rpm: f32) -> f32 {
        for pair in self.nodes.windows(2) {
            let (r0, v0) = pair[0];
            let (r1, v1) = pair[1];
            if rpm < r1 {
                return v0 + (rpm - r0) * (v1 - v0) / (r1 - r0);
            }
        }
        self.max_value as f32
    }
}

/// Spindle with optional PWM speed control
pub struct Spindle<P> {
    pwm: P,
    ramp: Option<PwmRamp>,
    enable_rpm_controlled: bool,
    /// PWM output currently above the off level
    pwm_enabled: bool,
    /// PWM setup failed once; on/off only from now on
    pwm_failed: bool,
}

impl<P: PwmChannel> Spindle<P> {
    pub fn new(pwm: P) -> Self {
        Self {
            pwm,
            ramp: None,
            enable_rpm_controlled: false,
            pwm_enabled: false,
            pwm_failed: false,
        }
    }

    /// Precompute the ramp and program the PWM channel
    ///
    /// A spindle with PWM disabled or an empty RPM range is on/off only.
    /// If the PWM channel rejects its configuration the spindle is stopped
    /// and stays on/off only; the error is returned once and
    /// `HalError::NotSupported` afterwards.
    pub fn configure<B: OutputBackend>(
        &mut self,
        settings: &SpindleSettings,
        clock_hz: u32,
        out: &mut Outputs<B>,
    ) -> HalResult<()> {
        self.enable_rpm_controlled = settings.enable_rpm_controlled;
        let variable = !settings.pwm_disable && settings.rpm_max > settings.rpm_min;

        if self.pwm_failed || !variable {
            if self.pwm_enabled {
                self.set_state(out, SpindleState::default(), 0.0);
            }
            self.ramp = None;
            return if self.pwm_failed {
                Err(HalError::NotSupported)
            } else {
                Ok(())
            };
        }

        let result = PwmRamp::compute(settings, clock_hz).and_then(|ramp| {
            self.pwm.configure(ramp.timing())?;
            Ok(ramp)
        });
        match result {
            Ok(ramp) => {
                self.pwm.set_level(ramp.off_value);
                self.pwm_enabled = false;
                self.ramp = Some(ramp);
                Ok(())
            }
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("spindle PWM unavailable: {}", e);
                self.pwm_failed = true;
                self.ramp = None;
                self.set_state(out, SpindleState::default(), 0.0);
                Err(e)
            }
        }
    }

    /// Start or stop the spindle
    pub fn set_state<B: OutputBackend>(
        &mut self,
        out: &mut Outputs<B>,
        state: SpindleState,
        rpm: f32,
    ) {
        let level = self.ramp.as_ref().map(|r| {
            if state.on {
                r.value(rpm)
            } else {
                r.off_value
            }
        });
        match level {
            Some(level) => {
                if state.on {
                    out.spindle_dir(state.ccw);
                }
                if !self.enable_rpm_controlled {
                    out.spindle_enable(state.on);
                }
                self.set_speed(out, level);
            }
            None => {
                if state.on {
                    out.spindle_dir(state.ccw);
                }
                out.spindle_enable(state.on);
            }
        }
    }

    /// Write a precomputed PWM level
    ///
    /// The off level stops the PWM (and the enable pin when RPM
    /// controlled); any other level starts it.
    pub fn set_speed<B: OutputBackend>(&mut self, out: &mut Outputs<B>, level: u32) {
        let Some((off_value, always_on)) = self.ramp.as_ref().map(|r| (r.off_value, r.always_on))
        else {
            return;
        };
        if level == off_value {
            self.pwm_enabled = false;
            if self.enable_rpm_controlled {
                out.spindle_enable(false);
            }
            self.pwm.set_level(if always_on { off_value } else { 0 });
        } else {
            if !self.pwm_enabled {
                out.spindle_enable(true);
                self.pwm_enabled = true;
            }
            self.pwm.set_level(level);
        }
    }

    /// Speed update from the planner, same as [`Self::set_speed`]
    #[inline]
    pub fn update_pwm<B: OutputBackend>(&mut self, out: &mut Outputs<B>, level: u32) {
        self.set_speed(out, level);
    }

    /// PWM level for `rpm`, 0 for an on/off spindle
    pub fn get_pwm(&self, rpm: f32) -> u32 {
        self.ramp.as_ref().map_or(0, |r| r.value(rpm))
    }

    /// State read back from the pins
    ///
    /// Without an enable pin, "on" means the PWM is running.
    pub fn get_state<B: OutputBackend>(&self, out: &Outputs<B>) -> SpindleState {
        let mut state = out.spindle_pins();
        if !out.has_spindle_enable() {
            state.on = self.pwm_enabled;
        }
        state
    }

    /// Speed is PWM controlled
    pub fn is_variable(&self) -> bool {
        self.ramp.is_some()
    }

    pub fn ramp(&self) -> Option<&PwmRamp> {
        self.ramp.as_ref()
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{DriverSettings, RpmPoint};
    use crate::periph::outputs::tests::MockBank;
    use crate::signals::PinFunction;

    const CLOCK_HZ: u32 = 125_000_000;

    #[derive(Default)]
    pub(crate) struct MockPwm {
        pub(crate) timing: Option<PwmTiming>,
        pub(crate) level: u32,
        pub(crate) fail: bool,
    }

    impl PwmChannel for MockPwm {
        fn configure(&mut self, timing: PwmTiming) -> HalResult<()> {
            if self.fail {
                return Err(HalError::Busy);
            }
            self.timing = Some(timing);
            Ok(())
        }

        fn set_level(&mut self, level: u32) {
            self.level = level;
        }

        fn level(&self) -> u32 {
            self.level
        }
    }

    fn outputs() -> Outputs<MockBank> {
        Outputs::new(
            MockBank::with(&[PinFunction::SpindleOn, PinFunction::SpindleDir]),
            &DriverSettings::default(),
        )
    }

    fn spindle(settings: &SpindleSettings, out: &mut Outputs<MockBank>) -> Spindle<MockPwm> {
        let mut spindle = Spindle::new(MockPwm::default());
        spindle.configure(settings, CLOCK_HZ, out).unwrap();
        spindle
    }

    fn on(ccw: bool) -> SpindleState {
        SpindleState { on: true, ccw }
    }

    #[test]
    fn test_prescaler_thresholds() {
        assert_eq!(PwmRamp::prescaler(5000.0), 1);
        assert_eq!(PwmRamp::prescaler(2000.0), 12);
        assert_eq!(PwmRamp::prescaler(1000.0), 12);
        assert_eq!(PwmRamp::prescaler(200.0), 50);
    }

    #[test]
    fn test_linear_ramp() {
        let ramp = PwmRamp::compute(&SpindleSettings::default(), CLOCK_HZ).unwrap();
        assert_eq!(ramp.period, 25_000);
        assert_eq!(ramp.off_value, 0);
        assert!(!ramp.always_on);
        assert_eq!(ramp.value(0.0), 0);
        assert_eq!(ramp.value(500.0), 12_500);
        assert_eq!(ramp.value(1000.0), 25_000);
        assert_eq!(ramp.value(5000.0), 25_000);
    }

    #[test]
    fn test_below_rpm_min_is_min_value() {
        let settings = SpindleSettings {
            rpm_min: 100.0,
            pwm_min_percent: 10.0,
            ..Default::default()
        };
        let ramp = PwmRamp::compute(&settings, CLOCK_HZ).unwrap();
        assert_eq!(ramp.value(50.0), 2_500);
        assert_eq!(ramp.value(0.0), 0);
    }

    #[test]
    fn test_off_percent_keeps_pwm_on() {
        let settings = SpindleSettings {
            pwm_off_percent: 10.0,
            ..Default::default()
        };
        let ramp = PwmRamp::compute(&settings, CLOCK_HZ).unwrap();
        assert!(ramp.always_on);
        assert_eq!(ramp.off_value, 2_500);
    }

    #[test]
    fn test_inverted_pwm_off_is_zero() {
        let mut settings = SpindleSettings::default();
        settings.invert.pwm = true;
        let ramp = PwmRamp::compute(&settings, CLOCK_HZ).unwrap();
        assert_eq!(ramp.off_value, 0);
        assert_eq!(ramp.value(1000.0), 25_000);
        assert!(ramp.timing().invert);
    }

    #[test]
    fn test_inverted_pwm_idle_after_configure() {
        let mut settings = SpindleSettings::default();
        settings.invert.pwm = true;
        let mut out = outputs();
        let mut spindle = spindle(&settings, &mut out);
        assert!(spindle.pwm().timing.unwrap().invert);
        let after_configure = spindle.pwm().level;

        spindle.set_state(&mut out, on(false), 500.0);
        assert_eq!(spindle.pwm().level, 12_500);
        spindle.set_state(&mut out, SpindleState::default(), 0.0);
        assert_eq!(after_configure, 0);
        assert_eq!(spindle.pwm().level, after_configure);
    }

    #[test]
    fn test_piecewise_curve() {
        let mut settings = SpindleSettings::default();
        settings
            .rpm_points
            .push(RpmPoint {
                rpm: 500.0,
                duty_percent: 80.0,
            })
            .unwrap();
        let ramp = PwmRamp::compute(&settings, CLOCK_HZ).unwrap();
        assert_eq!(ramp.value(250.0), 10_000);
        assert_eq!(ramp.value(750.0), 22_500);
    }

    #[test]
    fn test_set_state_writes_exact_level() {
        let mut out = outputs();
        let mut sp = spindle(&SpindleSettings::default(), &mut out);
        assert_eq!(sp.pwm().timing.map(|t| t.period), Some(25_000));

        sp.set_state(&mut out, on(true), 500.0);
        assert_eq!(sp.pwm().level, 12_500);
        assert_eq!(sp.get_state(&out), on(true));

        let level = sp.get_pwm(250.0);
        sp.update_pwm(&mut out, level);
        assert_eq!(sp.pwm().level, 6_250);

        sp.set_state(&mut out, SpindleState::default(), 0.0);
        assert_eq!(sp.pwm().level, 0);
        assert!(!sp.get_state(&out).on);
    }

    #[test]
    fn test_rpm_controlled_enable_follows_pwm() {
        let settings = SpindleSettings {
            enable_rpm_controlled: true,
            ..Default::default()
        };
        let mut out = outputs();
        let mut sp = spindle(&settings, &mut out);

        sp.set_state(&mut out, on(false), 0.0);
        assert!(!out.spindle_pins().on);

        sp.set_state(&mut out, on(false), 300.0);
        assert!(out.spindle_pins().on);

        let off = sp.get_pwm(0.0);
        sp.set_speed(&mut out, off);
        assert!(!out.spindle_pins().on);
    }

    #[test]
    fn test_pwm_config_failure_falls_back_to_on_off() {
        let mut out = outputs();
        let mut sp = Spindle::new(MockPwm {
            fail: true,
            ..Default::default()
        });
        assert_eq!(
            sp.configure(&SpindleSettings::default(), CLOCK_HZ, &mut out),
            Err(HalError::Busy)
        );
        assert!(!sp.is_variable());
        assert_eq!(sp.get_pwm(500.0), 0);

        sp.set_state(&mut out, on(true), 500.0);
        assert_eq!(sp.get_state(&out), on(true));
        assert_eq!(sp.pwm().level, 0);

        // Not retried for the session
        assert_eq!(
            sp.configure(&SpindleSettings::default(), CLOCK_HZ, &mut out),
            Err(HalError::NotSupported)
        );
    }

    #[test]
    fn test_pwm_disable_is_on_off() {
        let settings = SpindleSettings {
            pwm_disable: true,
            ..Default::default()
        };
        let mut out = outputs();
        let mut sp = spindle(&settings, &mut out);
        assert!(!sp.is_variable());
        sp.set_state(&mut out, on(false), 1000.0);
        assert!(out.spindle_pins().on);
        sp.set_state(&mut out, SpindleState::default(), 0.0);
        assert!(!out.spindle_pins().on);
    }

    #[test]
    fn test_state_without_enable_pin_tracks_pwm() {
        let mut out = Outputs::new(MockBank::with(&[]), &DriverSettings::default());
        let mut sp = spindle(&SpindleSettings::default(), &mut out);
        sp.set_state(&mut out, on(false), 400.0);
        assert!(sp.get_state(&out).on);
        sp.set_state(&mut out, SpindleState::default(), 0.0);
        assert!(!sp.get_state(&out).on);
    }
}
