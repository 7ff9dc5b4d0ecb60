//! Stepper control commands
//!
//! Requests from the planner and homing code are queued in order and
//! applied between ticks by whoever owns the [`StepperControl`]. Every
//! queued command is applied; none replaces an earlier one.

use cadence_hal::timer::TickTimer;

use crate::signals::AxisMask;

use super::{
    EnableSteppers, PulseGenerator, SquaringMode, StepBackend, StepSource, StepperTimer,
};

/// Stepper timer and pulse requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepperCommand {
    /// Enable the drivers and start ticking
    Wake,
    /// Stop ticking
    Idle,
    /// New tick period in timer cycles
    CyclesPerTick(u32),
    /// Hold motors of ganged axes for squaring
    DisableMotors { axes: AxisMask, mode: SquaringMode },
    /// Step outside the planner's stream
    InjectStep { step: AxisMask, dir: AxisMask },
}

/// Pulse generator paced by its tick timer
pub struct StepperControl<B: StepBackend, T: TickTimer> {
    pub pulses: PulseGenerator<B>,
    pub timer: StepperTimer<T>,
}

impl<B: StepBackend, T: TickTimer> StepperControl<B, T> {
    pub fn new(pulses: PulseGenerator<B>, timer: StepperTimer<T>) -> Self {
        Self { pulses, timer }
    }

    /// Apply one command
    ///
    /// `drivers` is only touched by [`StepperCommand::Wake`].
    pub fn apply<E: EnableSteppers>(&mut self, cmd: StepperCommand, drivers: &mut E) {
        match cmd {
            StepperCommand::Wake => self.timer.wake_up(drivers),
            StepperCommand::Idle => self.timer.go_idle(),
            StepperCommand::CyclesPerTick(cycles) => self.timer.cycles_per_tick(cycles),
            StepperCommand::DisableMotors { axes, mode } => self.pulses.disable_motors(axes, mode),
            StepperCommand::InjectStep { step, dir } => self.pulses.output_step(step, dir),
        }
    }

    /// Tick: fetch one step command and start its pulse
    #[inline]
    pub fn on_tick<S: StepSource>(&mut self, source: &mut S) {
        if let Some(cmd) = self.timer.on_tick(source) {
            self.pulses.pulse_start(&cmd);
        }
    }
}
