//! Inter-task communication channels
//!
//! Static channels and signals shared between the embassy tasks, plus the
//! adapters that let the core's `EventSink` and `StepSource` sit on top of
//! them.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use portable_atomic::{AtomicU16, Ordering};

use cadence_core::clock::{AtomicFlags, TickCounter};
use cadence_core::events::{EventSink, SignalEvent, EVENT_QUEUE_LEN};
use cadence_core::periph::aux::MAX_ANALOG_PORTS;
use cadence_core::signals::{CoolantState, SpindleState};
use cadence_core::stepper::{StepCommand, StepSource, StepperCommand};
use cadence_hal_rp2040::watch::PinWatch;

/// Step commands buffered ahead of the tick
const STEP_QUEUE_LEN: usize = 32;

/// Stepper control commands buffered between ticks
const STEPPER_QUEUE_LEN: usize = 8;

/// Peripheral commands buffered for the periph task
const PERIPH_QUEUE_LEN: usize = 8;

/// 1 ms system tick
pub static TICKS: TickCounter = TickCounter::new();

/// Trigger and event state of every watched input pin
pub static PIN_WATCH: PinWatch = PinWatch::new();

/// Resolved input events for the state machine
pub static EVENTS: Channel<CriticalSectionRawMutex, SignalEvent, EVENT_QUEUE_LEN> =
    Channel::new();

/// Step commands from the planner, one per tick
pub static STEP_QUEUE: Channel<CriticalSectionRawMutex, StepCommand, STEP_QUEUE_LEN> =
    Channel::new();

/// Stepper timer control, applied in order
pub static STEPPER_CMD: Channel<CriticalSectionRawMutex, StepperCommand, STEPPER_QUEUE_LEN> =
    Channel::new();

/// Spindle, coolant and aux output requests
pub static PERIPH_CMD: Channel<CriticalSectionRawMutex, PeriphCommand, PERIPH_QUEUE_LEN> =
    Channel::new();

/// Latest raw reading of each analog input port
pub static ANALOG_LEVELS: [AtomicU16; MAX_ANALOG_PORTS] =
    [const { AtomicU16::new(0) }; MAX_ANALOG_PORTS];

/// Bit 0: stepper timer running
pub static STATUS: AtomicFlags = AtomicFlags::new(0);

pub const STATUS_STEPPING: u32 = 1 << 0;

/// Output requests
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PeriphCommand {
    Spindle { state: SpindleState, rpm: f32 },
    Coolant(CoolantState),
    DigitalOut { port: u8, on: bool },
    AnalogOut { port: u8, value: f32 },
}

/// Event sink over [`EVENTS`]
pub struct ChannelSink;

impl EventSink for ChannelSink {
    fn push(&mut self, event: SignalEvent) -> Result<(), SignalEvent> {
        EVENTS.try_send(event).map_err(|TrySendError::Full(e)| e)
    }
}

/// Step source over [`STEP_QUEUE`]
pub struct QueuedSteps;

impl StepSource for QueuedSteps {
    #[inline]
    fn next_step(&mut self) -> Option<StepCommand> {
        STEP_QUEUE.try_receive().ok()
    }
}

/// Latest reading of analog input `port`
pub fn analog_level(port: u8) -> Option<u16> {
    ANALOG_LEVELS
        .get(usize::from(port))
        .map(|l| l.load(Ordering::Relaxed))
}
