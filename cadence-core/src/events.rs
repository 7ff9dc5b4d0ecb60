//! Signal events
//!
//! Interrupt-side code never calls into the planner. It pushes a
//! [`SignalEvent`] into a bounded [`EventSink`] and the consumer drains it
//! at a safe point.

use heapless::Deque;

use crate::signals::{ControlSignals, LimitSignals};

/// Interrupt sources that can be claimed by a peripheral driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqKind {
    /// Keypad or display strobe on the I2C bus
    I2cStrobe,
    /// SPI device interrupt
    Spi,
}

/// Resolved input transition for the planner/state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignalEvent {
    /// Limit switches changed; merged snapshot at dispatch time
    Limits(LimitSignals),
    /// Control inputs changed
    Control(ControlSignals),
    /// Unbound aux input changed
    AuxInput { port: u8, level: bool },
    /// Claimed peripheral interrupt fired
    Irq { kind: IrqKind, low: bool },
    /// MPG mode select pin changed; `enable` is the requested MPG state
    MpgSelect { enable: bool },
}

/// Non-blocking event destination
pub trait EventSink {
    /// Queue an event, handing it back if there is no room
    fn push(&mut self, event: SignalEvent) -> Result<(), SignalEvent>;
}

impl<const N: usize> EventSink for Deque<SignalEvent, N> {
    fn push(&mut self, event: SignalEvent) -> Result<(), SignalEvent> {
        self.push_back(event)
    }
}

/// Default event queue depth
pub const EVENT_QUEUE_LEN: usize = 16;

/// Event queue owned by the input side
pub type EventQueue = Deque<SignalEvent, EVENT_QUEUE_LEN>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deque_sink_hands_back_on_full() {
        let mut q: Deque<SignalEvent, 1> = Deque::new();
        let ev = SignalEvent::MpgSelect { enable: true };
        assert!(EventSink::push(&mut q, ev).is_ok());
        assert_eq!(EventSink::push(&mut q, ev), Err(ev));
        assert_eq!(q.pop_front(), Some(ev));
    }
}
