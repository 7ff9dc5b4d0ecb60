//! Per-pin interrupt control
//!
//! The classifier arms and disarms individual inputs as part of its
//! debounce protocols. Disabling a pin (`IrqMode::None`) is the only
//! cancellation primitive the platform offers.

/// Interrupt trigger for a single input pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqMode {
    /// Interrupt disabled
    #[default]
    None,
    /// Rising edge
    Rising,
    /// Falling edge
    Falling,
    /// Both edges
    Change,
    /// Level low
    Low,
    /// Level high
    High,
}

impl IrqMode {
    /// Check if this mode leaves the pin able to fire
    pub fn is_enabled(self) -> bool {
        self != IrqMode::None
    }

    /// Level trigger that fires while the pin is at `high`
    pub const fn level(high: bool) -> Self {
        if high {
            IrqMode::High
        } else {
            IrqMode::Low
        }
    }

    /// Edge trigger that fires when the pin becomes `high`
    pub const fn edge_to(high: bool) -> Self {
        if high {
            IrqMode::Rising
        } else {
            IrqMode::Falling
        }
    }
}

/// Conditions reported with a pin interrupt
///
/// Mirrors the event bits latched by the GPIO block. Several may be set at
/// once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinEvents(pub u8);

impl PinEvents {
    /// Pin is at level low
    pub const LEVEL_LOW: Self = Self(1 << 0);
    /// Pin is at level high
    pub const LEVEL_HIGH: Self = Self(1 << 1);
    /// Falling edge seen
    pub const EDGE_FALL: Self = Self(1 << 2);
    /// Rising edge seen
    pub const EDGE_RISE: Self = Self(1 << 3);

    /// Check if any of `other`'s bits are set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Combine two event sets
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Events implied by a level-triggered interrupt at `high`
    pub const fn from_level(high: bool) -> Self {
        if high {
            Self::LEVEL_HIGH
        } else {
            Self::LEVEL_LOW
        }
    }

    /// Whether the events say the pin ended up high
    ///
    /// Level bits win over edge bits; a rising edge implies high.
    pub const fn is_high(self) -> bool {
        if self.contains(Self::LEVEL_HIGH) {
            true
        } else if self.contains(Self::LEVEL_LOW) {
            false
        } else {
            self.contains(Self::EDGE_RISE)
        }
    }
}

/// Per-pin interrupt enable control
pub trait PinInterrupts {
    /// Set the trigger for `pin`, replacing any previous one
    fn set_irq_mode(&mut self, pin: u8, mode: IrqMode);

    /// Current trigger for `pin`
    fn irq_mode(&self, pin: u8) -> IrqMode;

    /// Clear any latched event for `pin`
    fn acknowledge(&mut self, _pin: u8) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_level_wins_over_edge() {
        let ev = PinEvents::EDGE_RISE.union(PinEvents::LEVEL_LOW);
        assert!(!ev.is_high());
        assert!(PinEvents::EDGE_RISE.is_high());
        assert!(!PinEvents::EDGE_FALL.is_high());
        assert!(PinEvents::from_level(true).is_high());
    }

    #[test]
    fn test_mode_helpers() {
        assert_eq!(IrqMode::level(true), IrqMode::High);
        assert_eq!(IrqMode::level(false), IrqMode::Low);
        assert_eq!(IrqMode::edge_to(true), IrqMode::Rising);
        assert_eq!(IrqMode::edge_to(false), IrqMode::Falling);
        assert!(!IrqMode::None.is_enabled());
    }
}
