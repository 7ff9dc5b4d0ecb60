//! Stepper tick timer
//!
//! Owns the periodic step interrupt source. Waking up enables the drivers
//! and runs one short warm-up period before the planner's cadence applies.

use cadence_hal::timer::TickTimer;

use crate::signals::AxisMask;

use super::{EnableSteppers, StepCommand, StepSource};

/// Longest programmable tick period in timer cycles
pub const MAX_CYCLES_PER_TICK: u32 = 1_000_000;

/// Warm-up period divisor: `f_step_timer / 500` is ~2 ms
const WARM_UP_DIVISOR: u32 = 500;

/// Timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerState {
    Idle,
    Running {
        /// First tick has not fired yet, period is the warm-up delay
        warming_up: bool,
    },
}

/// Step cadence controller
pub struct StepperTimer<T: TickTimer> {
    timer: T,
    state: TimerState,
    cycles_per_tick: u32,
}

impl<T: TickTimer> StepperTimer<T> {
    pub fn new(timer: T) -> Self {
        Self {
            timer,
            state: TimerState::Idle,
            cycles_per_tick: MAX_CYCLES_PER_TICK,
        }
    }

    /// Warm-up period in timer cycles
    pub fn warm_up_cycles(&self) -> u32 {
        self.timer.frequency_hz() / WARM_UP_DIVISOR
    }

    /// Enable all drivers and start ticking after the warm-up delay
    pub fn wake_up<E: EnableSteppers>(&mut self, drivers: &mut E) {
        drivers.enable_steppers(AxisMask::ALL);
        let warm_up = self.warm_up_cycles();
        self.timer.set_period(warm_up);
        self.timer.start();
        self.state = TimerState::Running { warming_up: true };
    }

    /// Stop the tick interrupt
    pub fn go_idle(&mut self) {
        self.timer.stop();
        self.state = TimerState::Idle;
    }

    /// Set the tick period, clamped to [`MAX_CYCLES_PER_TICK`]
    ///
    /// During warm-up the value is stored and applied on the first tick.
    pub fn cycles_per_tick(&mut self, cycles: u32) {
        self.cycles_per_tick = cycles.min(MAX_CYCLES_PER_TICK);
        if self.state == (TimerState::Running { warming_up: false }) {
            self.timer.set_period(self.cycles_per_tick);
        }
    }

    /// Handle one tick: exactly one upcall to `source`
    ///
    /// Returns the command to pulse, if any. Spurious ticks while idle are
    /// ignored.
    pub fn on_tick<S: StepSource>(&mut self, source: &mut S) -> Option<StepCommand> {
        match self.state {
            TimerState::Idle => return None,
            TimerState::Running { warming_up: true } => {
                self.timer.set_period(self.cycles_per_tick);
                self.state = TimerState::Running { warming_up: false };
            }
            TimerState::Running { warming_up: false } => {}
        }
        source.next_step()
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    /// Stored cadence in timer cycles
    pub fn period(&self) -> u32 {
        self.cycles_per_tick
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MockTimer {
        periods: heapless::Vec<u32, 16>,
        running: bool,
    }

    impl TickTimer for MockTimer {
        fn frequency_hz(&self) -> u32 {
            10_000_000
        }

        fn set_period(&mut self, cycles: u32) {
            let _ = self.periods.push(cycles);
        }

        fn start(&mut self) {
            self.running = true;
        }

        fn stop(&mut self) {
            self.running = false;
        }
    }

    #[derive(Default)]
    struct MockDrivers {
        enabled: AxisMask,
    }

    impl EnableSteppers for MockDrivers {
        fn enable_steppers(&mut self, axes: AxisMask) {
            self.enabled = axes;
        }
    }

    struct CountingSource {
        calls: u32,
    }

    impl StepSource for CountingSource {
        fn next_step(&mut self) -> Option<StepCommand> {
            self.calls += 1;
            Some(StepCommand {
                step: AxisMask::X,
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_wake_up_warms_up_then_restores_cadence() {
        let mut timer = StepperTimer::new(MockTimer::default());
        let mut drivers = MockDrivers::default();
        let mut source = CountingSource { calls: 0 };

        timer.wake_up(&mut drivers);
        timer.cycles_per_tick(2_500);
        assert!(timer.on_tick(&mut source).is_some());

        timer.go_idle();
        assert!(!timer.timer().running);
        assert_eq!(timer.state(), TimerState::Idle);

        timer.wake_up(&mut drivers);
        assert_eq!(drivers.enabled, AxisMask::ALL);
        assert!(timer.timer().running);
        // Warm-up first, 10 MHz / 500 = 20_000 cycles (2 ms)
        assert_eq!(timer.timer().periods.last(), Some(&20_000));
        assert_eq!(timer.state(), TimerState::Running { warming_up: true });

        timer.on_tick(&mut source);
        assert_eq!(timer.timer().periods.last(), Some(&2_500));
        assert_eq!(timer.state(), TimerState::Running { warming_up: false });
    }

    #[test]
    fn test_cadence_stored_during_warm_up() {
        let mut timer = StepperTimer::new(MockTimer::default());
        timer.wake_up(&mut MockDrivers::default());
        timer.cycles_per_tick(1_234);
        assert_eq!(timer.timer().periods.last(), Some(&20_000));
        assert_eq!(timer.period(), 1_234);
    }

    #[test]
    fn test_cycles_clamped() {
        let mut timer = StepperTimer::new(MockTimer::default());
        let mut source = CountingSource { calls: 0 };
        timer.wake_up(&mut MockDrivers::default());
        timer.on_tick(&mut source);
        timer.cycles_per_tick(5_000_000);
        assert_eq!(timer.timer().periods.last(), Some(&MAX_CYCLES_PER_TICK));
    }

    #[test]
    fn test_one_upcall_per_tick() {
        let mut timer = StepperTimer::new(MockTimer::default());
        let mut source = CountingSource { calls: 0 };
        assert!(timer.on_tick(&mut source).is_none());
        assert_eq!(source.calls, 0);

        timer.wake_up(&mut MockDrivers::default());
        for _ in 0..3 {
            timer.on_tick(&mut source);
        }
        assert_eq!(source.calls, 3);
    }
}
