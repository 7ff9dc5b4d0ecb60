//! Driver settings
//!
//! Everything the motion core needs from the persisted machine settings.
//! The settings store itself lives outside the core; a copy of this struct
//! is handed to each component on construction and on every change.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::signals::{AxisMask, ControlSignals, CoolantState};

/// Debounce and latch confirm delay applied to limits, probe and door
pub const DEBOUNCE_DELAY_MS: u32 = 40;

/// Maximum piecewise spindle breakpoints
pub const MAX_RPM_POINTS: usize = 4;

/// Step/dir/enable output settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepperSettings {
    pub step_invert: AxisMask,
    pub dir_invert: AxisMask,
    pub enable_invert: AxisMask,
    /// Extra direction inversion for the second motor of ganged axes
    pub ganged_dir_invert: AxisMask,
    /// Ganged axes that home with auto-squaring
    pub auto_square: AxisMask,
    /// Step pulse width in microseconds
    pub pulse_us: f32,
    /// Delay between direction change and step pulse in microseconds
    pub pulse_delay_us: f32,
}

impl Default for StepperSettings {
    fn default() -> Self {
        Self {
            step_invert: AxisMask::NONE,
            dir_invert: AxisMask::NONE,
            enable_invert: AxisMask::NONE,
            ganged_dir_invert: AxisMask::NONE,
            auto_square: AxisMask::NONE,
            pulse_us: 5.0,
            pulse_delay_us: 0.0,
        }
    }
}

/// Limit switch settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LimitSettings {
    pub invert: AxisMask,
    pub disable_pullup: AxisMask,
    /// Hard limits raise events while not homing
    pub hard_enabled: bool,
    /// Axes that home towards their max switch
    pub home_to_max: AxisMask,
}

/// Control input settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlSettings {
    pub invert: ControlSignals,
    pub disable_pullup: ControlSignals,
}

/// Probe input settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProbeSettings {
    pub invert: bool,
    pub disable_pullup: bool,
}

/// Spindle output inversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpindleInvert {
    pub on: bool,
    pub ccw: bool,
    pub pwm: bool,
}

/// One breakpoint of a piecewise RPM to duty curve
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RpmPoint {
    pub rpm: f32,
    /// Duty cycle in percent of the PWM period
    pub duty_percent: f32,
}

/// Variable spindle settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpindleSettings {
    pub pwm_freq_hz: f32,
    pub rpm_min: f32,
    pub rpm_max: f32,
    /// Duty while stopped, percent; non-zero keeps PWM always on
    pub pwm_off_percent: f32,
    pub pwm_min_percent: f32,
    pub pwm_max_percent: f32,
    pub invert: SpindleInvert,
    /// Spindle enable follows PWM instead of the on/off command
    pub enable_rpm_controlled: bool,
    /// Force on/off-only spindle
    pub pwm_disable: bool,
    /// Piecewise curve; linear between rpm_min and rpm_max when empty
    pub rpm_points: Vec<RpmPoint, MAX_RPM_POINTS>,
}

impl Default for SpindleSettings {
    fn default() -> Self {
        Self {
            pwm_freq_hz: 5000.0,
            rpm_min: 0.0,
            rpm_max: 1000.0,
            pwm_off_percent: 0.0,
            pwm_min_percent: 0.0,
            pwm_max_percent: 100.0,
            invert: SpindleInvert::default(),
            enable_rpm_controlled: false,
            pwm_disable: false,
            rpm_points: Vec::new(),
        }
    }
}

/// All settings consumed by the motion core
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DriverSettings {
    pub steppers: StepperSettings,
    pub limits: LimitSettings,
    pub control: ControlSettings,
    pub probe: ProbeSettings,
    pub spindle: SpindleSettings,
    pub coolant_invert: CoolantState,
    /// Debounce limit switches in software
    pub software_debounce: bool,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            steppers: StepperSettings::default(),
            limits: LimitSettings::default(),
            control: ControlSettings::default(),
            probe: ProbeSettings::default(),
            spindle: SpindleSettings::default(),
            coolant_invert: CoolantState::default(),
            software_debounce: true,
        }
    }
}
