//! Time base and shared flag words
//!
//! The 1 ms system tick is counted here and read by the planner. Flag
//! words shared with interrupt handlers are updated through
//! [`AtomicFlags`], which falls back to critical sections on cores without
//! atomic read-modify-write.

use portable_atomic::{AtomicU32, Ordering};

use cadence_hal::timer::MicrosClock;

/// Monotonic millisecond tick counter
pub struct TickCounter {
    ticks: AtomicU32,
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TickCounter {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
        }
    }

    /// Advance by one tick (called from the 1 ms interrupt)
    pub fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Ticks since boot, wraps after ~49 days
    pub fn elapsed_ticks(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }
}

/// Planner-facing time source
pub struct Clock<'a, M: MicrosClock> {
    ticks: &'a TickCounter,
    micros: M,
}

impl<'a, M: MicrosClock> Clock<'a, M> {
    pub fn new(ticks: &'a TickCounter, micros: M) -> Self {
        Self { ticks, micros }
    }

    /// Milliseconds counted by the system tick
    pub fn elapsed_ticks(&self) -> u32 {
        self.ticks.elapsed_ticks()
    }

    /// Microseconds since boot
    pub fn elapsed_micros(&self) -> u64 {
        self.micros.now_us()
    }
}

/// Milliseconds from `now` until `deadline`, zero if already due
///
/// Tick values wrap; anything more than half the range away counts as due.
pub fn ms_until(now: u32, deadline: u32) -> u32 {
    let d = deadline.wrapping_sub(now);
    if d > u32::MAX / 2 {
        0
    } else {
        d
    }
}

/// Whether `deadline` has been reached at `now`
pub fn is_due(now: u32, deadline: u32) -> bool {
    ms_until(now, deadline) == 0
}

/// Flag word with atomic bit helpers
pub struct AtomicFlags {
    value: AtomicU32,
}

impl Default for AtomicFlags {
    fn default() -> Self {
        Self::new(0)
    }
}

impl AtomicFlags {
    pub const fn new(value: u32) -> Self {
        Self {
            value: AtomicU32::new(value),
        }
    }

    /// Set `bits`, returning the previous word
    pub fn set_bits(&self, bits: u32) -> u32 {
        self.value.fetch_or(bits, Ordering::AcqRel)
    }

    /// Clear `bits`, returning the previous word
    pub fn clear_bits(&self, bits: u32) -> u32 {
        self.value.fetch_and(!bits, Ordering::AcqRel)
    }

    /// Replace the word, returning the previous one
    pub fn set_value(&self, value: u32) -> u32 {
        self.value.swap(value, Ordering::AcqRel)
    }

    pub fn get(&self) -> u32 {
        self.value.load(Ordering::Acquire)
    }
}
