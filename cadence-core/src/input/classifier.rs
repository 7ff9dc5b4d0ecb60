//! Interrupt classifier
//!
//! Single entry point for pin interrupts. Looks the pin up in the signal
//! table, then dispatches by group:
//!
//! - Limits: disable the pin and recheck after the debounce delay
//! - Safety door and probe: latch the active edge, confirm after the delay
//! - Other controls: report immediately
//! - Aux inputs: aux-control handler or plain aux event
//! - I2C strobe / SPI IRQ: forwarded only if claimed
//! - MPG select: disable and report, re-armed by the consumer
//!
//! Each watched pin moves Armed -> Debouncing/Latched -> Armed; events for
//! a pin that is not Armed are ignored.

use heapless::Vec;

use cadence_hal::gpio::{GpioPort, Pull};
use cadence_hal::irq::{IrqMode, PinEvents, PinInterrupts};

use crate::config::{
    ConfigError, ControlSettings, DriverSettings, LimitSettings, ProbeSettings, DEBOUNCE_DELAY_MS,
};
use crate::events::{EventSink, IrqKind, SignalEvent};
use crate::signals::{
    AxisMask, ControlSignals, LimitSignals, PinFunction, ProbeState, SignalGroup, SignalTable,
    WatchState, MAX_INPUTS,
};

use super::aux::{AuxCtrl, AuxCtrlFunction, MAX_AUX_CTRL};
use super::debounce::{DebounceAction, DebounceError, DebounceScheduler, Token};
use super::latch::next_irq_mode;

#[derive(Debug, Clone, Copy, Default)]
struct ProbeLatch {
    inverted: bool,
    triggered: bool,
    is_probing: bool,
}

/// Input event router and signal state owner
pub struct InputClassifier<IO> {
    table: SignalTable,
    io: IO,
    limits: LimitSettings,
    control: ControlSettings,
    probe_settings: ProbeSettings,
    software_debounce: bool,
    delay_ms: u32,
    debounce: DebounceScheduler,
    /// Token of the debounce entry each input is waiting on
    pending: [Option<Token>; MAX_INPUTS],
    probe: ProbeLatch,
    door_latched: bool,
    aux_ctrl: Vec<AuxCtrl, MAX_AUX_CTRL>,
    /// Limit pins (by port bit) whose interrupt limits_enable left on
    limit_irq_enabled: u32,
    i2c_claimed: bool,
    spi_claimed: bool,
    dropped: u32,
}

impl<IO: GpioPort + PinInterrupts> InputClassifier<IO> {
    /// Take ownership of the signal table and input port, then configure
    pub fn new(table: SignalTable, io: IO, settings: &DriverSettings) -> Self {
        let mut classifier = Self {
            table,
            io,
            limits: settings.limits,
            control: settings.control,
            probe_settings: settings.probe,
            software_debounce: settings.software_debounce,
            delay_ms: DEBOUNCE_DELAY_MS,
            debounce: DebounceScheduler::new(),
            pending: [None; MAX_INPUTS],
            probe: ProbeLatch::default(),
            door_latched: false,
            aux_ctrl: Vec::new(),
            limit_irq_enabled: 0,
            i2c_claimed: false,
            spi_claimed: false,
            dropped: 0,
        };
        classifier.configure(settings);
        classifier
    }

    /// (Re)initialise every input from settings
    ///
    /// Sets inversion and pulls, computes the interrupt trigger of each pin
    /// and enables it, except for limits (see [`Self::limits_enable`]),
    /// unbound aux inputs and the probe (see [`Self::probe_configure`]).
    /// Pending debounce entries are dropped.
    pub fn configure(&mut self, settings: &DriverSettings) {
        self.limits = settings.limits;
        self.control = settings.control;
        self.probe_settings = settings.probe;
        self.software_debounce = settings.software_debounce;
        self.debounce.reset();
        self.pending = [None; MAX_INPUTS];
        self.door_latched = false;
        self.limit_irq_enabled = 0;

        let control = self.control;
        let control_fei = ControlSignals(control.disable_pullup.0 ^ control.invert.0);
        let limits = self.limits;
        let limit_fei = limits.disable_pullup ^ limits.invert;
        let probe = self.probe_settings;

        for input in self.table.inputs_mut() {
            if input.group == SignalGroup::AuxInputAnalog {
                continue;
            }
            input.state = WatchState::Armed;
            input.invert = false;
            input.irq_mode = IrqMode::None;
            let mut pullup = true;

            match input.function {
                PinFunction::LimitMin(axis)
                | PinFunction::LimitMin2(axis)
                | PinFunction::LimitMax(axis)
                | PinFunction::LimitMax2(axis) => {
                    pullup = !limits.disable_pullup.contains(axis);
                    input.invert = limit_fei.contains(axis);
                }
                PinFunction::Probe => {
                    pullup = !probe.disable_pullup;
                    input.invert = probe.invert;
                }
                PinFunction::I2cStrobe => input.irq_mode = IrqMode::Change,
                PinFunction::SpiIrq | PinFunction::MpgSelect => input.irq_mode = IrqMode::Falling,
                f if f.group() == SignalGroup::Control => {
                    let bit = f.control_bit();
                    pullup = !control.disable_pullup.contains(bit);
                    input.invert = control_fei.contains(bit);
                }
                _ => {}
            }

            if matches!(
                input.group,
                SignalGroup::Limit | SignalGroup::LimitMax | SignalGroup::Control
            ) {
                // Edge towards the active level
                input.irq_mode = IrqMode::edge_to(!input.invert);
            }

            input.pull = if pullup { Pull::Up } else { Pull::Down };
            self.io.set_pull(input.pin, input.pull);

            if input.function == PinFunction::SafetyDoor {
                let active = input.is_active(self.io.level(input.pin));
                input.irq_mode = next_irq_mode(active, input.invert);
            }

            let enable_now = !matches!(
                input.group,
                SignalGroup::Limit | SignalGroup::LimitMax | SignalGroup::AuxInput | SignalGroup::Probe
            );
            self.io.set_irq_mode(
                input.pin,
                if enable_now { input.irq_mode } else { IrqMode::None },
            );
            self.io.acknowledge(input.pin);
        }

        for i in 0..self.aux_ctrl.len() {
            self.aux_ctrl[i].debouncing = false;
            self.arm_aux_ctrl(i);
        }

        self.probe_configure(false, false);
    }

    /// Bind an aux input to a control function
    ///
    /// Edge modes are replaced by the edge towards the active level given by
    /// the control inversion settings; `Change` reports deasserts too.
    pub fn bind_aux_ctrl(
        &mut self,
        function: AuxCtrlFunction,
        port: u8,
        irq_mode: IrqMode,
    ) -> Result<(), ConfigError> {
        let pin_fn = PinFunction::AuxIn(port);
        if self.table.find_input_fn(pin_fn).is_none() {
            return Err(ConfigError::MissingPin(pin_fn));
        }
        if self
            .aux_ctrl
            .iter()
            .any(|c| c.port == port || c.function == function)
        {
            return Err(ConfigError::UnsupportedPort(pin_fn));
        }
        self.aux_ctrl
            .push(AuxCtrl::new(function, port, irq_mode))
            .map_err(|_| ConfigError::TableFull)?;
        self.arm_aux_ctrl(self.aux_ctrl.len() - 1);
        Ok(())
    }

    fn arm_aux_ctrl(&mut self, i: usize) {
        let ctrl = self.aux_ctrl[i];
        let invert = self.control.invert.contains(ctrl.function.control_bit());
        let mode = match ctrl.irq_mode {
            IrqMode::Rising | IrqMode::Falling => IrqMode::edge_to(!invert),
            m => m,
        };
        self.aux_ctrl[i].irq_mode = mode;
        if let Some(idx) = self.table.find_input_fn(PinFunction::AuxIn(ctrl.port)) {
            let input = &mut self.table.inputs_mut()[idx];
            input.invert = invert;
            input.irq_mode = mode;
            input.state = WatchState::Armed;
            self.io.set_irq_mode(input.pin, mode);
        }
    }

    /// Enable interrupts on an unbound aux input
    ///
    /// Returns false if the port has no input or is bound to a control.
    pub fn set_aux_irq(&mut self, port: u8, mode: IrqMode) -> bool {
        if self.aux_ctrl.iter().any(|c| c.port == port) {
            return false;
        }
        match self.table.find_input_fn(PinFunction::AuxIn(port)) {
            Some(idx) => {
                let input = &mut self.table.inputs_mut()[idx];
                input.irq_mode = mode;
                self.io.set_irq_mode(input.pin, mode);
                true
            }
            None => false,
        }
    }

    /// Claim the strobe/IRQ input of a peripheral, once
    pub fn claim_irq(&mut self, kind: IrqKind) -> bool {
        let (function, claimed) = match kind {
            IrqKind::I2cStrobe => (PinFunction::I2cStrobe, &mut self.i2c_claimed),
            IrqKind::Spi => (PinFunction::SpiIrq, &mut self.spi_claimed),
        };
        if *claimed || self.table.find_input_fn(function).is_none() {
            return false;
        }
        *claimed = true;
        true
    }

    /// Classify a pin interrupt
    ///
    /// # Arguments
    /// - `pin`: GPIO number that fired
    /// - `events`: conditions latched with the interrupt
    /// - `now`: system tick in ms
    pub fn on_pin_event<S: EventSink>(&mut self, pin: u8, events: PinEvents, now: u32, sink: &mut S) {
        let Some(idx) = self.table.find_input(pin) else {
            return;
        };
        let input = self.table.inputs()[idx];
        if input.state != WatchState::Armed {
            return;
        }

        match input.group {
            SignalGroup::Limit | SignalGroup::LimitMax => self.limit_event(idx, now, sink),
            SignalGroup::Control if input.function == PinFunction::SafetyDoor => {
                self.latch_event(idx, events.is_high(), now, sink)
            }
            SignalGroup::Control => {
                let state = self.control_state();
                self.emit(sink, SignalEvent::Control(state));
            }
            SignalGroup::Probe => self.latch_event(idx, events.is_high(), now, sink),
            SignalGroup::AuxInput => self.aux_event(idx, now, sink),
            SignalGroup::I2c if input.function == PinFunction::I2cStrobe && self.i2c_claimed => {
                let low = !self.io.level(pin);
                self.emit(sink, SignalEvent::Irq { kind: IrqKind::I2cStrobe, low });
            }
            SignalGroup::Spi if input.function == PinFunction::SpiIrq && self.spi_claimed => {
                let low = !self.io.level(pin);
                self.emit(sink, SignalEvent::Irq { kind: IrqKind::Spi, low });
            }
            SignalGroup::Mpg => {
                self.io.set_irq_mode(pin, IrqMode::None);
                let enable = !self.io.level(pin);
                self.emit(sink, SignalEvent::MpgSelect { enable });
            }
            _ => {}
        }
    }

    fn limit_event<S: EventSink>(&mut self, idx: usize, now: u32, sink: &mut S) {
        if self.software_debounce {
            match self.schedule(idx, now, DebounceAction::LimitRecheck) {
                Ok(()) => {
                    let input = &mut self.table.inputs_mut()[idx];
                    input.state = WatchState::Debouncing;
                    self.io.set_irq_mode(input.pin, IrqMode::None);
                    return;
                }
                Err(_e) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("limit debounce skipped: {}", _e);
                }
            }
        }
        let state = self.limits_state();
        self.emit(sink, SignalEvent::Limits(state));
    }

    fn latch_invert(&self, idx: usize) -> bool {
        let input = &self.table.inputs()[idx];
        if input.group == SignalGroup::Probe {
            self.probe.inverted
        } else {
            input.invert
        }
    }

    fn set_latch(&mut self, idx: usize, on: bool) {
        if self.table.inputs()[idx].group == SignalGroup::Probe {
            self.probe.triggered = on;
        } else {
            self.door_latched = on;
        }
    }

    /// Arm the level interrupt that detects the next change
    fn rearm_level(&mut self, idx: usize, active_now: bool, invert: bool) {
        let probe_idle =
            self.table.inputs()[idx].group == SignalGroup::Probe && !self.probe.is_probing;
        let mode = if probe_idle {
            IrqMode::None
        } else {
            next_irq_mode(active_now, invert)
        };
        let input = &mut self.table.inputs_mut()[idx];
        input.irq_mode = mode;
        self.io.set_irq_mode(input.pin, mode);
    }

    fn latch_event<S: EventSink>(&mut self, idx: usize, level: bool, now: u32, sink: &mut S) {
        let pin = self.table.inputs()[idx].pin;
        let invert = self.latch_invert(idx);
        self.io.set_irq_mode(pin, IrqMode::None);

        if level ^ invert {
            self.set_latch(idx, true);
            if self.table.inputs()[idx].function == PinFunction::SafetyDoor {
                let state = self.control_state();
                self.emit(sink, SignalEvent::Control(state));
            }
            match self.schedule(idx, now, DebounceAction::LatchConfirm) {
                Ok(()) => self.table.inputs_mut()[idx].state = WatchState::Latched,
                Err(_e) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("latch confirm not armed: {}", _e);
                    // Wait for the inactive level instead
                    self.rearm_level(idx, true, invert);
                }
            }
        } else {
            // Clears a latch left by a confirm timer that could not be armed
            self.set_latch(idx, false);
            self.rearm_level(idx, false, invert);
        }
    }

    fn aux_event<S: EventSink>(&mut self, idx: usize, now: u32, sink: &mut S) {
        let input = self.table.inputs()[idx];
        let PinFunction::AuxIn(port) = input.function else {
            return;
        };
        let Some(ci) = self.aux_ctrl.iter().position(|c| c.port == port) else {
            let level = self.io.level(input.pin);
            self.emit(sink, SignalEvent::AuxInput { port, level });
            return;
        };

        let ctrl = self.aux_ctrl[ci];
        if ctrl.debouncing {
            return;
        }
        if ctrl.function == AuxCtrlFunction::SafetyDoor {
            match self.schedule(idx, now, DebounceAction::AuxDoorSettle) {
                Ok(()) => {
                    self.aux_ctrl[ci].debouncing = true;
                    self.table.inputs_mut()[idx].state = WatchState::Debouncing;
                    return;
                }
                Err(_e) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("aux door debounce skipped: {}", _e);
                }
            }
        }

        let mut signals = ctrl.function.control_bit();
        let mut deasserted = false;
        if ctrl.irq_mode == IrqMode::Change {
            deasserted = !input.is_active(self.io.level(input.pin));
            signals = signals.with(ControlSignals::DEASSERTED, deasserted);
        }
        if !deasserted {
            signals = signals | self.control_state();
        }
        self.emit(sink, SignalEvent::Control(signals));
    }

    fn schedule(&mut self, idx: usize, now: u32, action: DebounceAction) -> Result<(), DebounceError> {
        let token = self.debounce.arm(idx as u8, now, self.delay_ms, action)?;
        self.pending[idx] = Some(token);
        Ok(())
    }

    /// Earliest pending debounce deadline, for the timer owner
    pub fn next_deadline(&self) -> Option<u32> {
        self.debounce.next_deadline()
    }

    /// Run every debounce entry due at `now`
    pub fn service_timers<S: EventSink>(&mut self, now: u32, sink: &mut S) {
        while let Some(expired) = self.debounce.expire(now) {
            let idx = usize::from(expired.pin);
            let Some(input) = self.table.input(idx).copied() else {
                continue;
            };
            // Only the entry this input is waiting on
            if self.pending[idx] != Some(expired.token) {
                continue;
            }
            self.pending[idx] = None;

            match expired.action {
                DebounceAction::LimitRecheck => {
                    if input.state != WatchState::Debouncing {
                        continue;
                    }
                    self.table.inputs_mut()[idx].state = WatchState::Armed;
                    if self.limit_irq_enabled & input.bit == 0 {
                        continue;
                    }
                    self.io.set_irq_mode(input.pin, input.irq_mode);
                    let state = self.limits_state();
                    if !state.merge().is_empty() {
                        self.emit(sink, SignalEvent::Limits(state));
                    }
                }
                DebounceAction::LatchConfirm => {
                    if input.state != WatchState::Latched {
                        continue;
                    }
                    self.table.inputs_mut()[idx].state = WatchState::Armed;
                    self.set_latch(idx, false);
                    let invert = self.latch_invert(idx);
                    let active_now = self.io.level(input.pin) ^ invert;
                    self.rearm_level(idx, active_now, invert);
                }
                DebounceAction::AuxDoorSettle => {
                    if input.state != WatchState::Debouncing {
                        continue;
                    }
                    self.table.inputs_mut()[idx].state = WatchState::Armed;
                    if let Some(ctrl) = self
                        .aux_ctrl
                        .iter_mut()
                        .find(|c| c.function == AuxCtrlFunction::SafetyDoor)
                    {
                        ctrl.debouncing = false;
                    }
                    let state = self.control_state();
                    if state.contains(ControlSignals::SAFETY_DOOR_AJAR) {
                        self.emit(sink, SignalEvent::Control(state));
                    }
                }
            }
        }
    }

    /// Enable or disable limit interrupts
    ///
    /// Only takes effect with hard limits enabled. During a homing cycle the
    /// switches used as homing source for the cycle's axes stay disabled.
    pub fn limits_enable(&mut self, on: bool, homing_cycle: AxisMask) {
        let on = on && self.limits.hard_enabled;
        let home_max = homing_cycle & self.limits.home_to_max;
        let home_min = homing_cycle & !self.limits.home_to_max;
        self.limit_irq_enabled = 0;

        for input in self.table.inputs_mut() {
            if !matches!(input.group, SignalGroup::Limit | SignalGroup::LimitMax) {
                continue;
            }
            let mut disable = !on;
            if on && !homing_cycle.is_empty() {
                if let Some(axis) = input.function.axis() {
                    disable = if input.group == SignalGroup::Limit {
                        home_min.contains(axis)
                    } else {
                        home_max.contains(axis)
                    };
                }
            }
            if !disable {
                self.limit_irq_enabled |= input.bit;
            }
            // A debouncing pin is re-armed by its recheck
            if input.state == WatchState::Armed {
                self.io.set_irq_mode(
                    input.pin,
                    if disable { IrqMode::None } else { input.irq_mode },
                );
            }
        }
    }

    /// Live limit switch snapshot
    pub fn limits_state(&self) -> LimitSignals {
        let mut state = LimitSignals::default();
        for input in self.table.inputs() {
            let active = input.is_active(self.io.level(input.pin));
            match input.function {
                PinFunction::LimitMin(a) => state.min = state.min.with(a, active),
                PinFunction::LimitMin2(a) => state.min2 = state.min2.with(a, active),
                PinFunction::LimitMax(a) => state.max = state.max.with(a, active),
                PinFunction::LimitMax2(a) => state.max2 = state.max2.with(a, active),
                _ => {}
            }
        }
        state
    }

    /// Control snapshot; the safety door includes its latch
    pub fn control_state(&self) -> ControlSignals {
        let mut state = ControlSignals::NONE;
        for input in self.table.inputs_in(SignalGroup::Control) {
            let mut active = input.is_active(self.io.level(input.pin));
            if input.function == PinFunction::SafetyDoor {
                active |= self.door_latched;
            }
            if active {
                state = state | input.function.control_bit();
            }
        }
        for ctrl in &self.aux_ctrl {
            let Some(input) = self
                .table
                .inputs()
                .iter()
                .find(|i| i.function == PinFunction::AuxIn(ctrl.port))
            else {
                continue;
            };
            let active = (ctrl.function == AuxCtrlFunction::SafetyDoor && ctrl.debouncing)
                || input.is_active(self.io.level(input.pin));
            if active {
                state = state | ctrl.function.control_bit();
            }
        }
        state
    }

    /// Set probe polarity and arm it for a probing cycle
    ///
    /// # Arguments
    /// - `away`: probing away from the workpiece, polarity flipped
    /// - `probing`: a probing cycle starts; otherwise the interrupt is off
    pub fn probe_configure(&mut self, away: bool, probing: bool) {
        self.probe.triggered = false;
        self.probe.inverted = if away {
            !self.probe_settings.invert
        } else {
            self.probe_settings.invert
        };
        self.probe.is_probing = probing;

        if let Some(idx) = self.table.find_input_fn(PinFunction::Probe) {
            self.debounce.cancel(idx as u8);
            self.pending[idx] = None;
            let inverted = self.probe.inverted;
            let input = &mut self.table.inputs_mut()[idx];
            input.state = WatchState::Armed;
            input.invert = inverted;
            input.irq_mode = if probing {
                next_irq_mode(false, inverted)
            } else {
                IrqMode::None
            };
            self.io.set_irq_mode(input.pin, input.irq_mode);
        }
    }

    /// Probe state; while probing a latched trigger is held for the
    /// confirm delay
    pub fn probe_state(&self) -> ProbeState {
        let connected = !self
            .control_state()
            .contains(ControlSignals::PROBE_DISCONNECTED);
        let live = self
            .table
            .find_input_fn(PinFunction::Probe)
            .map(|idx| {
                let input = &self.table.inputs()[idx];
                self.io.level(input.pin) ^ self.probe.inverted
            })
            .unwrap_or(false);
        ProbeState {
            triggered: if self.probe.is_probing {
                self.probe.triggered || live
            } else {
                live
            },
            connected,
            inverted: self.probe.inverted,
            is_probing: self.probe.is_probing,
        }
    }

    /// Re-enable the MPG select pin after the consumer switched mode
    pub fn mpg_rearm(&mut self, mpg_mode: bool) {
        if let Some(idx) = self.table.find_input_fn(PinFunction::MpgSelect) {
            let input = &mut self.table.inputs_mut()[idx];
            input.irq_mode = if mpg_mode {
                IrqMode::Rising
            } else {
                IrqMode::Falling
            };
            self.io.set_irq_mode(input.pin, input.irq_mode);
        }
    }

    /// Report a mismatch between `mpg_mode` and the select pin, or re-arm
    pub fn mpg_sync<S: EventSink>(&mut self, mpg_mode: bool, sink: &mut S) {
        let Some(idx) = self.table.find_input_fn(PinFunction::MpgSelect) else {
            return;
        };
        let pin = self.table.inputs()[idx].pin;
        let requested = !self.io.level(pin);
        if requested != mpg_mode {
            self.io.set_irq_mode(pin, IrqMode::None);
            self.emit(sink, SignalEvent::MpgSelect { enable: requested });
        } else {
            self.mpg_rearm(mpg_mode);
        }
    }

    fn emit<S: EventSink>(&mut self, sink: &mut S, event: SignalEvent) {
        if let Err(_event) = sink.push(event) {
            self.dropped = self.dropped.wrapping_add(1);
            #[cfg(feature = "defmt")]
            defmt::warn!("event queue full, dropped {}", _event);
        }
    }

    /// Events lost to a full queue since boot
    pub fn dropped_events(&self) -> u32 {
        self.dropped
    }

    pub fn table(&self) -> &SignalTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut SignalTable {
        &mut self.table
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventQueue;
    use crate::signals::{Axis, BoardPin};
    use heapless::Deque;

    const LIMIT_X: u8 = 10;
    const LIMIT_Y_MAX: u8 = 11;
    const DOOR: u8 = 14;
    const FEED_HOLD: u8 = 15;
    const PROBE: u8 = 16;
    const AUX0: u8 = 20;
    const AUX1: u8 = 21;
    const STROBE: u8 = 22;
    const MPG: u8 = 23;

    /// GPIO bank with settable levels and recorded interrupt modes
    #[derive(Default)]
    struct MockIo {
        levels: u32,
        modes: [IrqMode; 32],
        pulls: [Pull; 32],
    }

    impl MockIo {
        fn set(&mut self, pin: u8, high: bool) {
            self.write_pin(pin, high);
        }
    }

    impl GpioPort for MockIo {
        fn read(&self) -> u32 {
            self.levels
        }

        fn write_masked(&mut self, mask: u32, value: u32) {
            self.levels = (self.levels & !mask) | (value & mask);
        }

        fn output_state(&self) -> u32 {
            self.levels
        }

        fn set_pull(&mut self, pin: u8, pull: Pull) {
            self.pulls[usize::from(pin)] = pull;
        }
    }

    impl PinInterrupts for MockIo {
        fn set_irq_mode(&mut self, pin: u8, mode: IrqMode) {
            self.modes[usize::from(pin)] = mode;
        }

        fn irq_mode(&self, pin: u8) -> IrqMode {
            self.modes[usize::from(pin)]
        }
    }

    fn table() -> SignalTable {
        SignalTable::from_board(&[
            BoardPin::gpio(PinFunction::LimitMin(Axis::X), LIMIT_X),
            BoardPin::gpio(PinFunction::LimitMax(Axis::Y), LIMIT_Y_MAX),
            BoardPin::gpio(PinFunction::SafetyDoor, DOOR),
            BoardPin::gpio(PinFunction::FeedHold, FEED_HOLD),
            BoardPin::gpio(PinFunction::Probe, PROBE),
            BoardPin::gpio(PinFunction::AuxIn(0), AUX0),
            BoardPin::gpio(PinFunction::AuxIn(1), AUX1),
            BoardPin::gpio(PinFunction::I2cStrobe, STROBE),
            BoardPin::gpio(PinFunction::MpgSelect, MPG),
        ])
        .unwrap()
    }

    fn settings() -> DriverSettings {
        let mut s = DriverSettings::default();
        s.limits.hard_enabled = true;
        s
    }

    fn classifier() -> InputClassifier<MockIo> {
        InputClassifier::new(table(), MockIo::default(), &settings())
    }

    fn high() -> PinEvents {
        PinEvents::LEVEL_HIGH
    }

    fn low() -> PinEvents {
        PinEvents::LEVEL_LOW
    }

    #[test]
    fn test_configure_arms_controls_not_limits() {
        let c = classifier();
        assert_eq!(c.io().irq_mode(FEED_HOLD), IrqMode::Rising);
        // Door low and not inverted: wait for the active (high) level
        assert_eq!(c.io().irq_mode(DOOR), IrqMode::High);
        assert_eq!(c.io().irq_mode(LIMIT_X), IrqMode::None);
        assert_eq!(c.io().irq_mode(PROBE), IrqMode::None);
        assert_eq!(c.io().irq_mode(STROBE), IrqMode::Change);
        assert_eq!(c.io().irq_mode(MPG), IrqMode::Falling);
        assert_eq!(c.io().pulls[usize::from(LIMIT_X)], Pull::Up);
    }

    #[test]
    fn test_disabled_pullup_flips_inversion() {
        let mut s = settings();
        s.control.disable_pullup = ControlSignals::FEED_HOLD;
        let c = InputClassifier::new(table(), MockIo::default(), &s);
        assert_eq!(c.io().pulls[usize::from(FEED_HOLD)], Pull::Down);
        assert_eq!(c.io().irq_mode(FEED_HOLD), IrqMode::Falling);
        // Low level now reads as active
        assert!(c.control_state().contains(ControlSignals::FEED_HOLD));
    }

    #[test]
    fn test_limit_rapid_edges_single_event() {
        let mut c = classifier();
        let mut q = EventQueue::new();
        c.limits_enable(true, AxisMask::NONE);
        assert_eq!(c.io().irq_mode(LIMIT_X), IrqMode::Rising);

        c.io_mut().set(LIMIT_X, true);
        c.on_pin_event(LIMIT_X, PinEvents::EDGE_RISE, 0, &mut q);
        assert_eq!(c.io().irq_mode(LIMIT_X), IrqMode::None);

        // Bounces while debouncing are ignored
        for t in [3, 7, 12, 30] {
            c.io_mut().set(LIMIT_X, t % 2 == 0);
            c.on_pin_event(LIMIT_X, PinEvents::EDGE_RISE, t, &mut q);
        }
        c.io_mut().set(LIMIT_X, true);
        c.service_timers(39, &mut q);
        assert!(q.is_empty());

        c.service_timers(40, &mut q);
        assert_eq!(q.len(), 1);
        let expected = LimitSignals {
            min: AxisMask::X,
            ..Default::default()
        };
        assert_eq!(q.pop_front(), Some(SignalEvent::Limits(expected)));
        assert_eq!(c.io().irq_mode(LIMIT_X), IrqMode::Rising);
    }

    #[test]
    fn test_limit_released_during_debounce_not_reported() {
        let mut c = classifier();
        let mut q = EventQueue::new();
        c.limits_enable(true, AxisMask::NONE);

        c.io_mut().set(LIMIT_X, true);
        c.on_pin_event(LIMIT_X, PinEvents::EDGE_RISE, 0, &mut q);
        c.io_mut().set(LIMIT_X, false);
        c.service_timers(40, &mut q);
        assert!(q.is_empty());
        assert_eq!(c.io().irq_mode(LIMIT_X), IrqMode::Rising);
    }

    #[test]
    fn test_limit_without_software_debounce_is_immediate() {
        let mut s = settings();
        s.software_debounce = false;
        let mut c = InputClassifier::new(table(), MockIo::default(), &s);
        let mut q = EventQueue::new();
        c.limits_enable(true, AxisMask::NONE);

        c.io_mut().set(LIMIT_Y_MAX, true);
        c.on_pin_event(LIMIT_Y_MAX, PinEvents::EDGE_RISE, 0, &mut q);
        let expected = LimitSignals {
            max: AxisMask::Y,
            ..Default::default()
        };
        assert_eq!(q.pop_front(), Some(SignalEvent::Limits(expected)));
    }

    #[test]
    fn test_limit_pool_exhausted_dispatches_immediately() {
        let mut c = classifier();
        let mut q = EventQueue::new();
        c.limits_enable(true, AxisMask::NONE);
        for pin in 100..(100 + crate::input::DEBOUNCE_SLOTS as u8) {
            c.debounce
                .arm(pin, 0, 40, DebounceAction::LatchConfirm)
                .unwrap();
        }

        c.io_mut().set(LIMIT_X, true);
        c.on_pin_event(LIMIT_X, PinEvents::EDGE_RISE, 0, &mut q);
        assert_eq!(q.len(), 1);
        // Interrupt stays enabled in degraded mode
        assert_eq!(c.io().irq_mode(LIMIT_X), IrqMode::Rising);
    }

    #[test]
    fn test_limits_enable_masks_homing_source() {
        let mut c = classifier();
        c.limits_enable(true, AxisMask::X);
        assert_eq!(c.io().irq_mode(LIMIT_X), IrqMode::None);
        assert_eq!(c.io().irq_mode(LIMIT_Y_MAX), IrqMode::Rising);

        c.limits_enable(false, AxisMask::NONE);
        assert_eq!(c.io().irq_mode(LIMIT_Y_MAX), IrqMode::None);

        let mut s = settings();
        s.limits.hard_enabled = false;
        c.configure(&s);
        c.limits_enable(true, AxisMask::NONE);
        assert_eq!(c.io().irq_mode(LIMIT_X), IrqMode::None);
    }

    #[test]
    fn test_safety_door_latch_scenario() {
        let mut c = classifier();
        let mut q = EventQueue::new();

        // t=0 door opens
        c.io_mut().set(DOOR, true);
        c.on_pin_event(DOOR, high(), 0, &mut q);
        match q.pop_front() {
            Some(SignalEvent::Control(s)) => assert!(s.contains(ControlSignals::SAFETY_DOOR_AJAR)),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(c.io().irq_mode(DOOR), IrqMode::None);

        // t=10 door closes again, interrupt is off
        c.io_mut().set(DOOR, false);
        c.service_timers(10, &mut q);

        // t=20 still reported open
        c.service_timers(20, &mut q);
        assert!(c.control_state().contains(ControlSignals::SAFETY_DOOR_AJAR));

        // t=41 confirm has run
        c.service_timers(41, &mut q);
        assert!(!c.control_state().contains(ControlSignals::SAFETY_DOOR_AJAR));
        assert_eq!(c.io().irq_mode(DOOR), IrqMode::High);
        assert!(q.is_empty());
    }

    #[test]
    fn test_door_still_open_after_confirm_waits_for_close() {
        let mut c = classifier();
        let mut q = EventQueue::new();
        c.io_mut().set(DOOR, true);
        c.on_pin_event(DOOR, high(), 0, &mut q);
        c.service_timers(40, &mut q);
        assert_eq!(c.io().irq_mode(DOOR), IrqMode::Low);
        assert!(c.control_state().contains(ControlSignals::SAFETY_DOOR_AJAR));

        // Close: no event, re-armed for the next opening
        c.io_mut().set(DOOR, false);
        q.clear();
        c.on_pin_event(DOOR, low(), 50, &mut q);
        assert!(q.is_empty());
        assert_eq!(c.io().irq_mode(DOOR), IrqMode::High);
    }

    #[test]
    fn test_door_without_confirm_slot_waits_for_close() {
        let mut c = classifier();
        let mut q = EventQueue::new();
        for pin in 100..(100 + crate::input::DEBOUNCE_SLOTS as u8) {
            c.debounce
                .arm(pin, 0, 40, DebounceAction::LatchConfirm)
                .unwrap();
        }

        c.io_mut().set(DOOR, true);
        c.on_pin_event(DOOR, high(), 0, &mut q);
        assert_eq!(q.len(), 1);
        // Re-armed for the inactive level straight away
        assert_eq!(c.io().irq_mode(DOOR), IrqMode::Low);
        assert!(c.control_state().contains(ControlSignals::SAFETY_DOOR_AJAR));

        // Closing clears the latch
        c.io_mut().set(DOOR, false);
        q.clear();
        c.on_pin_event(DOOR, low(), 10, &mut q);
        assert!(q.is_empty());
        assert!(!c.control_state().contains(ControlSignals::SAFETY_DOOR_AJAR));
        assert_eq!(c.io().irq_mode(DOOR), IrqMode::High);
    }

    #[test]
    fn test_confirm_from_replaced_entry_ignored() {
        let mut c = classifier();
        let mut q = EventQueue::new();
        let idx = c.table.find_input(DOOR).unwrap();

        c.io_mut().set(DOOR, true);
        c.on_pin_event(DOOR, high(), 0, &mut q);
        c.io_mut().set(DOOR, false);

        // Entry swapped behind the classifier's back
        assert!(c.debounce.cancel(idx as u8));
        c.debounce
            .arm(idx as u8, 0, 40, DebounceAction::LatchConfirm)
            .unwrap();
        c.service_timers(40, &mut q);
        assert!(c.control_state().contains(ControlSignals::SAFETY_DOOR_AJAR));
        assert_eq!(c.io().irq_mode(DOOR), IrqMode::None);
    }

    #[test]
    fn test_events_while_latched_ignored() {
        let mut c = classifier();
        let mut q = EventQueue::new();
        c.io_mut().set(DOOR, true);
        c.on_pin_event(DOOR, high(), 0, &mut q);
        q.clear();
        c.on_pin_event(DOOR, high(), 5, &mut q);
        assert!(q.is_empty());
        assert!(c.debounce.is_armed(2));
    }

    #[test]
    fn test_probe_latch_holds_trigger() {
        let mut c = classifier();
        let mut q = EventQueue::new();
        c.probe_configure(false, true);
        assert_eq!(c.io().irq_mode(PROBE), IrqMode::High);

        c.io_mut().set(PROBE, true);
        c.on_pin_event(PROBE, high(), 0, &mut q);
        c.io_mut().set(PROBE, false);
        c.service_timers(10, &mut q);
        assert!(c.probe_state().triggered);

        c.service_timers(40, &mut q);
        assert!(!c.probe_state().triggered);
        assert_eq!(c.io().irq_mode(PROBE), IrqMode::High);
        assert!(q.is_empty());
    }

    #[test]
    fn test_probe_away_flips_polarity() {
        let mut c = classifier();
        c.probe_configure(true, true);
        let state = c.probe_state();
        assert!(state.inverted);
        assert!(state.is_probing);
        // Probe pin low reads as triggered when probing away
        assert!(state.triggered);
        assert_eq!(c.io().irq_mode(PROBE), IrqMode::Low);
    }

    #[test]
    fn test_probe_stays_off_after_cycle_ends() {
        let mut c = classifier();
        let mut q = EventQueue::new();
        c.probe_configure(false, true);
        c.io_mut().set(PROBE, true);
        c.on_pin_event(PROBE, high(), 0, &mut q);
        c.probe_configure(false, false);
        assert_eq!(c.io().irq_mode(PROBE), IrqMode::None);
        c.service_timers(40, &mut q);
        assert_eq!(c.io().irq_mode(PROBE), IrqMode::None);
        // Not probing: live level only
        assert!(c.probe_state().triggered);
        c.io_mut().set(PROBE, false);
        assert!(!c.probe_state().triggered);
    }

    #[test]
    fn test_control_reported_immediately() {
        let mut c = classifier();
        let mut q = EventQueue::new();
        c.io_mut().set(FEED_HOLD, true);
        c.on_pin_event(FEED_HOLD, PinEvents::EDGE_RISE, 0, &mut q);
        assert_eq!(
            q.pop_front(),
            Some(SignalEvent::Control(ControlSignals::FEED_HOLD))
        );
    }

    #[test]
    fn test_i2c_strobe_needs_claim() {
        let mut c = classifier();
        let mut q = EventQueue::new();
        c.on_pin_event(STROBE, PinEvents::EDGE_FALL, 0, &mut q);
        assert!(q.is_empty());

        assert!(c.claim_irq(IrqKind::I2cStrobe));
        assert!(!c.claim_irq(IrqKind::I2cStrobe));
        assert!(!c.claim_irq(IrqKind::Spi));

        c.on_pin_event(STROBE, PinEvents::EDGE_FALL, 1, &mut q);
        assert_eq!(
            q.pop_front(),
            Some(SignalEvent::Irq {
                kind: IrqKind::I2cStrobe,
                low: true
            })
        );
    }

    #[test]
    fn test_mpg_select_disables_until_rearmed() {
        let mut c = classifier();
        let mut q = EventQueue::new();
        c.on_pin_event(MPG, PinEvents::EDGE_FALL, 0, &mut q);
        assert_eq!(q.pop_front(), Some(SignalEvent::MpgSelect { enable: true }));
        assert_eq!(c.io().irq_mode(MPG), IrqMode::None);

        c.mpg_rearm(true);
        assert_eq!(c.io().irq_mode(MPG), IrqMode::Rising);

        // Pin released while in MPG mode: mismatch is reported
        c.io_mut().set(MPG, true);
        c.mpg_sync(true, &mut q);
        assert_eq!(q.pop_front(), Some(SignalEvent::MpgSelect { enable: false }));
    }

    #[test]
    fn test_unbound_aux_input_event() {
        let mut c = classifier();
        let mut q = EventQueue::new();
        assert!(c.set_aux_irq(0, IrqMode::Change));
        c.io_mut().set(AUX0, true);
        c.on_pin_event(AUX0, PinEvents::EDGE_RISE, 0, &mut q);
        assert_eq!(
            q.pop_front(),
            Some(SignalEvent::AuxInput { port: 0, level: true })
        );
    }

    #[test]
    fn test_aux_safety_door_debounced() {
        let mut c = classifier();
        let mut q = EventQueue::new();
        c.bind_aux_ctrl(AuxCtrlFunction::SafetyDoor, 1, IrqMode::Rising)
            .unwrap();
        assert_eq!(c.io().irq_mode(AUX1), IrqMode::Rising);
        assert!(!c.set_aux_irq(1, IrqMode::Change));

        c.io_mut().set(AUX1, true);
        c.on_pin_event(AUX1, PinEvents::EDGE_RISE, 0, &mut q);
        assert!(q.is_empty());
        assert!(c.control_state().contains(ControlSignals::SAFETY_DOOR_AJAR));

        c.service_timers(40, &mut q);
        match q.pop_front() {
            Some(SignalEvent::Control(s)) => assert!(s.contains(ControlSignals::SAFETY_DOOR_AJAR)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_aux_motor_fault_change_reports_deassert() {
        let mut c = classifier();
        let mut q = EventQueue::new();
        c.bind_aux_ctrl(AuxCtrlFunction::MotorFault, 0, IrqMode::Change)
            .unwrap();

        c.io_mut().set(AUX0, true);
        c.on_pin_event(AUX0, PinEvents::EDGE_RISE, 0, &mut q);
        assert_eq!(
            q.pop_front(),
            Some(SignalEvent::Control(ControlSignals::MOTOR_FAULT))
        );

        c.io_mut().set(AUX0, false);
        c.on_pin_event(AUX0, PinEvents::EDGE_FALL, 1, &mut q);
        assert_eq!(
            q.pop_front(),
            Some(SignalEvent::Control(
                ControlSignals::MOTOR_FAULT | ControlSignals::DEASSERTED
            ))
        );
    }

    #[test]
    fn test_probe_disconnect_via_aux() {
        let mut c = classifier();
        c.bind_aux_ctrl(AuxCtrlFunction::ProbeDisconnect, 0, IrqMode::Change)
            .unwrap();
        assert!(c.probe_state().connected);
        c.io_mut().set(AUX0, true);
        assert!(!c.probe_state().connected);
    }

    #[test]
    fn test_bind_aux_ctrl_errors() {
        let mut c = classifier();
        assert_eq!(
            c.bind_aux_ctrl(AuxCtrlFunction::MotorFault, 7, IrqMode::Change),
            Err(ConfigError::MissingPin(PinFunction::AuxIn(7)))
        );
        c.bind_aux_ctrl(AuxCtrlFunction::MotorFault, 0, IrqMode::Change)
            .unwrap();
        assert_eq!(
            c.bind_aux_ctrl(AuxCtrlFunction::MotorWarning, 0, IrqMode::Change),
            Err(ConfigError::UnsupportedPort(PinFunction::AuxIn(0)))
        );
    }

    #[test]
    fn test_full_queue_counts_dropped() {
        let mut c = classifier();
        let mut q: Deque<SignalEvent, 1> = Deque::new();
        c.io_mut().set(FEED_HOLD, true);
        c.on_pin_event(FEED_HOLD, PinEvents::EDGE_RISE, 0, &mut q);
        c.on_pin_event(FEED_HOLD, PinEvents::EDGE_RISE, 1, &mut q);
        assert_eq!(q.len(), 1);
        assert_eq!(c.dropped_events(), 1);
    }

    #[test]
    fn test_unknown_pin_ignored() {
        let mut c = classifier();
        let mut q = EventQueue::new();
        c.on_pin_event(29, PinEvents::EDGE_RISE, 0, &mut q);
        assert!(q.is_empty());
    }
}
