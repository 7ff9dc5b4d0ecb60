//! Debounce scheduler
//!
//! Fixed arena of one-shot deadlines keyed by input index. At most one
//! entry per pin. The owner polls [`DebounceScheduler::expire`] from a
//! single timer that sleeps until [`DebounceScheduler::next_deadline`].

use core::fmt;

use crate::clock::is_due;

/// Arena capacity
pub const DEBOUNCE_SLOTS: usize = 16;

/// What to do when a deadline expires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebounceAction {
    /// Re-enable a limit input and report if still asserted
    LimitRecheck,
    /// Release a latched door/probe and re-arm from the live level
    LatchConfirm,
    /// Safety door on an aux input has settled
    AuxDoorSettle,
}

/// Handle to an armed entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Token {
    slot: u8,
    generation: u16,
}

/// Arming failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebounceError {
    /// Every slot is in use
    PoolExhausted,
    /// The pin already has a pending entry
    AlreadyArmed,
}

impl fmt::Display for DebounceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoolExhausted => write!(f, "debounce pool exhausted"),
            Self::AlreadyArmed => write!(f, "pin already debouncing"),
        }
    }
}

/// An entry whose deadline passed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Expired {
    pub pin: u8,
    pub action: DebounceAction,
    pub token: Token,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    pin: u8,
    deadline: u32,
    action: DebounceAction,
    generation: u16,
    armed: bool,
}

impl Slot {
    const EMPTY: Self = Self {
        pin: 0,
        deadline: 0,
        action: DebounceAction::LimitRecheck,
        generation: 0,
        armed: false,
    };
}

/// `a` is earlier than `b` on the wrapping tick line
fn before(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}

/// Bounded one-shot timer pool
pub struct DebounceScheduler {
    slots: [Slot; DEBOUNCE_SLOTS],
}

impl Default for DebounceScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl DebounceScheduler {
    pub const fn new() -> Self {
        Self {
            slots: [Slot::EMPTY; DEBOUNCE_SLOTS],
        }
    }

    /// Schedule `action` for `pin` at `now + delay_ms`
    pub fn arm(
        &mut self,
        pin: u8,
        now: u32,
        delay_ms: u32,
        action: DebounceAction,
    ) -> Result<Token, DebounceError> {
        if self.is_armed(pin) {
            return Err(DebounceError::AlreadyArmed);
        }
        let (idx, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, s)| !s.armed)
            .ok_or(DebounceError::PoolExhausted)?;
        slot.pin = pin;
        slot.deadline = now.wrapping_add(delay_ms);
        slot.action = action;
        slot.armed = true;
        Ok(Token {
            slot: idx as u8,
            generation: slot.generation,
        })
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<u32> {
        self.slots
            .iter()
            .filter(|s| s.armed)
            .map(|s| s.deadline)
            .reduce(|a, b| if before(b, a) { b } else { a })
    }

    /// Pop the earliest entry due at `now`
    pub fn expire(&mut self, now: u32) -> Option<Expired> {
        let mut due: Option<usize> = None;
        for (i, s) in self.slots.iter().enumerate() {
            if s.armed && is_due(now, s.deadline) {
                match due {
                    Some(d) if !before(s.deadline, self.slots[d].deadline) => {}
                    _ => due = Some(i),
                }
            }
        }
        let i = due?;
        let slot = &mut self.slots[i];
        let expired = Expired {
            pin: slot.pin,
            action: slot.action,
            token: Token {
                slot: i as u8,
                generation: slot.generation,
            },
        };
        slot.armed = false;
        slot.generation = slot.generation.wrapping_add(1);
        Some(expired)
    }

    /// Drop the pending entry for `pin`
    pub fn cancel(&mut self, pin: u8) -> bool {
        match self.slots.iter_mut().find(|s| s.armed && s.pin == pin) {
            Some(slot) => {
                slot.armed = false;
                slot.generation = slot.generation.wrapping_add(1);
                true
            }
            None => false,
        }
    }

    /// Whether `token` still refers to its pending entry
    pub fn is_live(&self, token: Token) -> bool {
        self.slots
            .get(usize::from(token.slot))
            .is_some_and(|s| s.armed && s.generation == token.generation)
    }

    pub fn is_armed(&self, pin: u8) -> bool {
        self.slots.iter().any(|s| s.armed && s.pin == pin)
    }

    /// Number of pending entries
    pub fn pending(&self) -> usize {
        self.slots.iter().filter(|s| s.armed).count()
    }

    /// Drop every entry
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut().filter(|s| s.armed) {
            slot.armed = false;
            slot.generation = slot.generation.wrapping_add(1);
        }
    }
}
