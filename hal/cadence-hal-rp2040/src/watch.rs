//! Pin interrupt shim
//!
//! The core arms inputs through [`PinInterrupts`]; on this chip each watched
//! input is an async task ([`PinWatcher`]) that waits for the armed trigger
//! and posts the resulting [`PinEvents`] to a shared [`PinWatch`]. The input
//! task drains the pending events and feeds them to the classifier.
//!
//! Level triggers are one-shot: after firing, a watcher only tracks the
//! pin's level until its mode is written again. Disarmed pins are tracked
//! the same way, so [`WatchedInputs::read`] stays current.

use embassy_futures::select::{select, Either};
use embassy_rp::gpio::{AnyPin, Flex, Pull as RpPull};
use embassy_rp::Peri;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicU32, AtomicU8, Ordering};

use cadence_hal::gpio::{GpioPort, Pull};
use cadence_hal::irq::{IrqMode, PinEvents, PinInterrupts};

use crate::NUM_GPIO;

const fn mode_to_u8(mode: IrqMode) -> u8 {
    match mode {
        IrqMode::None => 0,
        IrqMode::Rising => 1,
        IrqMode::Falling => 2,
        IrqMode::Change => 3,
        IrqMode::Low => 4,
        IrqMode::High => 5,
    }
}

const fn mode_from_u8(v: u8) -> IrqMode {
    match v {
        1 => IrqMode::Rising,
        2 => IrqMode::Falling,
        3 => IrqMode::Change,
        4 => IrqMode::Low,
        5 => IrqMode::High,
        _ => IrqMode::None,
    }
}

const fn pull_from_u8(v: u8) -> RpPull {
    match v {
        1 => RpPull::Up,
        2 => RpPull::Down,
        _ => RpPull::None,
    }
}

/// Shared trigger, level and pending-event state for all watched pins
pub struct PinWatch {
    levels: AtomicU32,
    pending: AtomicU32,
    events: [AtomicU8; NUM_GPIO],
    modes: [AtomicU8; NUM_GPIO],
    pulls: [AtomicU8; NUM_GPIO],
    rearm: [Signal<CriticalSectionRawMutex, ()>; NUM_GPIO],
    fired: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for PinWatch {
    fn default() -> Self {
        Self::new()
    }
}

impl PinWatch {
    pub const fn new() -> Self {
        Self {
            levels: AtomicU32::new(0),
            pending: AtomicU32::new(0),
            events: [const { AtomicU8::new(0) }; NUM_GPIO],
            modes: [const { AtomicU8::new(0) }; NUM_GPIO],
            pulls: [const { AtomicU8::new(0) }; NUM_GPIO],
            rearm: [const { Signal::new() }; NUM_GPIO],
            fired: Signal::new(),
        }
    }

    pub fn mode(&self, pin: u8) -> IrqMode {
        self.modes
            .get(usize::from(pin))
            .map_or(IrqMode::None, |m| mode_from_u8(m.load(Ordering::Acquire)))
    }

    pub fn set_mode(&self, pin: u8, mode: IrqMode) {
        let n = usize::from(pin);
        if n < NUM_GPIO {
            self.modes[n].store(mode_to_u8(mode), Ordering::Release);
            self.rearm[n].signal(());
        }
    }

    fn set_pull(&self, pin: u8, pull: Pull) {
        let n = usize::from(pin);
        if n < NUM_GPIO {
            let v = match pull {
                Pull::None => 0,
                Pull::Up => 1,
                Pull::Down => 2,
            };
            self.pulls[n].store(v, Ordering::Release);
            self.rearm[n].signal(());
        }
    }

    /// Last sampled input levels
    pub fn levels(&self) -> u32 {
        self.levels.load(Ordering::Acquire)
    }

    fn publish_level(&self, pin: usize, high: bool) {
        if high {
            self.levels.bit_set(pin as u32, Ordering::AcqRel);
        } else {
            self.levels.bit_clear(pin as u32, Ordering::AcqRel);
        }
    }

    fn raise(&self, pin: usize, events: PinEvents) {
        self.events[pin].fetch_or(events.0, Ordering::AcqRel);
        self.pending.bit_set(pin as u32, Ordering::AcqRel);
        self.fired.signal(());
    }

    /// Wait until at least one pin has pending events
    pub async fn wait(&self) {
        if self.pending.load(Ordering::Acquire) == 0 {
            self.fired.wait().await;
        }
    }

    /// Take the next pin with pending events
    pub fn take_next(&self) -> Option<(u8, PinEvents)> {
        let pending = self.pending.load(Ordering::Acquire);
        if pending == 0 {
            return None;
        }
        let pin = pending.trailing_zeros();
        self.pending.bit_clear(pin, Ordering::AcqRel);
        let events = self.events[pin as usize].swap(0, Ordering::AcqRel);
        Some((pin as u8, PinEvents(events)))
    }
}

/// Classifier-side view of the watched inputs
#[derive(Clone, Copy)]
pub struct WatchedInputs {
    watch: &'static PinWatch,
}

impl WatchedInputs {
    pub const fn new(watch: &'static PinWatch) -> Self {
        Self { watch }
    }
}

impl GpioPort for WatchedInputs {
    fn read(&self) -> u32 {
        self.watch.levels()
    }

    fn write_masked(&mut self, _mask: u32, _value: u32) {}

    fn output_state(&self) -> u32 {
        0
    }

    fn set_pull(&mut self, pin: u8, pull: Pull) {
        self.watch.set_pull(pin, pull);
    }
}

impl PinInterrupts for WatchedInputs {
    fn set_irq_mode(&mut self, pin: u8, mode: IrqMode) {
        self.watch.set_mode(pin, mode);
    }

    fn irq_mode(&self, pin: u8) -> IrqMode {
        self.watch.mode(pin)
    }
}

/// Async watcher for one input pin
pub struct PinWatcher<'d> {
    input: Flex<'d>,
    pin: u8,
    watch: &'static PinWatch,
}

impl<'d> PinWatcher<'d> {
    pub fn new(pin: u8, io: Peri<'d, AnyPin>, watch: &'static PinWatch) -> Self {
        let mut input = Flex::new(io);
        input.set_as_input();
        Self { input, pin, watch }
    }

    fn sample(&mut self) {
        let n = usize::from(self.pin);
        self.input
            .set_pull(pull_from_u8(self.watch.pulls[n].load(Ordering::Acquire)));
        self.watch.publish_level(n, self.input.is_high());
    }

    /// Keep the published level current until the mode is rewritten
    async fn track_until_rearm(&mut self) {
        let n = usize::from(self.pin);
        let watch = self.watch;
        loop {
            let changed = select(self.input.wait_for_any_edge(), watch.rearm[n].wait()).await;
            if let Either::Second(()) = changed {
                return;
            }
            watch.publish_level(n, self.input.is_high());
        }
    }

    /// Watch the pin forever
    pub async fn run(&mut self) -> ! {
        let n = usize::from(self.pin);
        let watch = self.watch;
        loop {
            self.sample();
            let mode = watch.mode(self.pin);
            let rearm = &watch.rearm[n];
            let fired = match mode {
                IrqMode::None => {
                    self.track_until_rearm().await;
                    continue;
                }
                IrqMode::High => select(self.input.wait_for_high(), rearm.wait()).await,
                IrqMode::Low => select(self.input.wait_for_low(), rearm.wait()).await,
                // Every edge updates the level; only the armed one is raised
                IrqMode::Rising | IrqMode::Falling | IrqMode::Change => {
                    select(self.input.wait_for_any_edge(), rearm.wait()).await
                }
            };
            if let Either::Second(()) = fired {
                continue;
            }

            let high = self.input.is_high();
            watch.publish_level(n, high);
            let events = match mode {
                IrqMode::High | IrqMode::Low => PinEvents::from_level(high),
                IrqMode::Rising if !high => continue,
                IrqMode::Falling if high => continue,
                _ if high => PinEvents::EDGE_RISE,
                _ => PinEvents::EDGE_FALL,
            };
            watch.raise(n, events);

            if matches!(mode, IrqMode::High | IrqMode::Low) {
                self.track_until_rearm().await;
            }
        }
    }
}
