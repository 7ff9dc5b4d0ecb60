//! Digital outputs: stepper enable, coolant, spindle on/dir, aux outputs

use cadence_hal::HalResult;

use crate::config::{DriverSettings, SpindleInvert};
use crate::signals::{Axis, AxisMask, CoolantState, PinFunction, SpindleState};
use crate::stepper::EnableSteppers;

use super::OutputBackend;

/// Digital output façade over one [`OutputBackend`]
///
/// Keeps the logical state so a settings change can rewrite the pins with
/// the new inversion masks.
pub struct Outputs<B> {
    backend: B,
    enable_invert: AxisMask,
    coolant_invert: CoolantState,
    spindle_invert: SpindleInvert,
    enabled: AxisMask,
    coolant: CoolantState,
    spindle: SpindleState,
}

impl<B: OutputBackend> Outputs<B> {
    /// Wrap `backend`; all outputs start in their inactive state
    pub fn new(backend: B, settings: &DriverSettings) -> Self {
        let mut outputs = Self {
            backend,
            enable_invert: AxisMask::NONE,
            coolant_invert: CoolantState::default(),
            spindle_invert: SpindleInvert::default(),
            enabled: AxisMask::NONE,
            coolant: CoolantState::default(),
            spindle: SpindleState::default(),
        };
        outputs.configure(settings);
        outputs
    }

    /// Apply new inversion settings and rewrite every output
    pub fn configure(&mut self, settings: &DriverSettings) {
        self.enable_invert = settings.steppers.enable_invert;
        self.coolant_invert = settings.coolant_invert;
        self.spindle_invert = settings.spindle.invert;

        self.write_enable(self.enabled);
        self.write_coolant(self.coolant);
        self.write_spindle_on(self.spindle.on);
        self.write_spindle_dir(self.spindle.ccw);
        self.commit();
    }

    fn commit(&mut self) {
        if let Err(_e) = self.backend.flush() {
            #[cfg(feature = "defmt")]
            defmt::warn!("output flush failed: {}", _e);
        }
    }

    fn write_enable(&mut self, axes: AxisMask) {
        let levels = axes ^ self.enable_invert;
        for axis in Axis::ALL {
            self.backend
                .set(PinFunction::StepperEnable(axis), levels.contains(axis));
        }
        // A single shared enable pin follows X
        self.backend
            .set(PinFunction::StepperEnableAll, levels.contains(Axis::X));
    }

    fn write_coolant(&mut self, state: CoolantState) {
        self.backend.set(
            PinFunction::CoolantFlood,
            state.flood ^ self.coolant_invert.flood,
        );
        self.backend
            .set(PinFunction::CoolantMist, state.mist ^ self.coolant_invert.mist);
    }

    fn write_spindle_on(&mut self, on: bool) {
        self.backend
            .set(PinFunction::SpindleOn, on ^ self.spindle_invert.on);
    }

    fn write_spindle_dir(&mut self, ccw: bool) {
        self.backend
            .set(PinFunction::SpindleDir, ccw ^ self.spindle_invert.ccw);
    }

    /// Axes currently enabled
    pub fn enabled_steppers(&self) -> AxisMask {
        self.enabled
    }

    /// Set coolant outputs
    pub fn set_coolant(&mut self, state: CoolantState) -> HalResult<()> {
        self.coolant = state;
        self.write_coolant(state);
        self.backend.flush()
    }

    /// Coolant state read back from the pins
    pub fn coolant_state(&self) -> CoolantState {
        CoolantState {
            flood: self
                .backend
                .get(PinFunction::CoolantFlood)
                .is_some_and(|l| l ^ self.coolant_invert.flood),
            mist: self
                .backend
                .get(PinFunction::CoolantMist)
                .is_some_and(|l| l ^ self.coolant_invert.mist),
        }
    }

    /// Drive the spindle enable pin
    pub fn spindle_enable(&mut self, on: bool) {
        self.spindle.on = on;
        self.write_spindle_on(on);
        self.commit();
    }

    /// Drive the spindle direction pin
    pub fn spindle_dir(&mut self, ccw: bool) {
        self.spindle.ccw = ccw;
        self.write_spindle_dir(ccw);
        self.commit();
    }

    /// Whether the board has a spindle enable pin
    pub fn has_spindle_enable(&self) -> bool {
        self.backend.get(PinFunction::SpindleOn).is_some()
    }

    /// Spindle enable/dir read back from the pins
    ///
    /// Missing pins read as off / clockwise.
    pub fn spindle_pins(&self) -> SpindleState {
        SpindleState {
            on: self
                .backend
                .get(PinFunction::SpindleOn)
                .is_some_and(|l| l ^ self.spindle_invert.on),
            ccw: self
                .backend
                .get(PinFunction::SpindleDir)
                .is_some_and(|l| l ^ self.spindle_invert.ccw),
        }
    }

    /// Set a digital aux output
    ///
    /// Returns false if the port does not exist on this bank.
    pub fn digital_out(&mut self, port: u8, on: bool) -> bool {
        let function = PinFunction::AuxOut(port);
        if self.backend.get(function).is_none() {
            return false;
        }
        self.backend.set(function, on);
        self.commit();
        true
    }

    /// Level of a digital aux output
    pub fn digital_out_state(&self, port: u8) -> Option<bool> {
        self.backend.get(PinFunction::AuxOut(port))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: OutputBackend> EnableSteppers for Outputs<B> {
    fn enable_steppers(&mut self, axes: AxisMask) {
        self.enabled = axes;
        self.write_enable(axes);
        self.commit();
    }
}
