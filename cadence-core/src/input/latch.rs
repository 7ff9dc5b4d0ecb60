//! Latch-then-confirm re-arm rule
//!
//! Door and probe inputs are watched with level interrupts. After a latch
//! is confirmed (or an inactive level is seen) the pin is re-armed for the
//! level that means "the state changes from what it is now".

use cadence_hal::irq::IrqMode;

/// Level interrupt to arm next
///
/// | active now | invert | mode |
/// |---|---|---|
/// | false | false | High |
/// | false | true  | Low  |
/// | true  | false | Low  |
/// | true  | true  | High |
pub const fn next_irq_mode(active_now: bool, invert: bool) -> IrqMode {
    IrqMode::level(!(active_now ^ invert))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_not_inverted_waits_for_high() {
        assert_eq!(next_irq_mode(false, false), IrqMode::High);
    }

    #[test]
    fn test_inactive_inverted_waits_for_low() {
        assert_eq!(next_irq_mode(false, true), IrqMode::Low);
    }

    #[test]
    fn test_active_not_inverted_waits_for_low() {
        assert_eq!(next_irq_mode(true, false), IrqMode::Low);
    }

    #[test]
    fn test_active_inverted_waits_for_high() {
        assert_eq!(next_irq_mode(true, true), IrqMode::High);
    }
}
