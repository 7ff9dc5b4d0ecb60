//! GPIO port over individually owned pins
//!
//! Pins are added by number as the board map asks for them. Masked writes
//! only touch pins the port owns; other bits are ignored.

use embassy_rp::gpio::{AnyPin, Flex, Level, Pull as RpPull};
use embassy_rp::Peri;

use cadence_hal::gpio::{GpioPort, Pull};

use crate::NUM_GPIO;

pub struct FlexPort<'d> {
    pins: [Option<Flex<'d>>; NUM_GPIO],
    /// Bits of pins configured as outputs
    outputs: u32,
    /// Levels last driven on outputs
    state: u32,
}

impl Default for FlexPort<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'d> FlexPort<'d> {
    pub fn new() -> Self {
        Self {
            pins: [const { None }; NUM_GPIO],
            outputs: 0,
            state: 0,
        }
    }

    /// Add `pin` as GPIO `n`, driven to `initial`
    pub fn add_output(&mut self, n: u8, pin: Peri<'d, AnyPin>, initial: bool) {
        let Some(slot) = self.pins.get_mut(usize::from(n)) else {
            return;
        };
        let mut flex = Flex::new(pin);
        flex.set_level(Level::from(initial));
        flex.set_as_output();
        *slot = Some(flex);
        self.outputs |= 1 << n;
        if initial {
            self.state |= 1 << n;
        } else {
            self.state &= !(1 << n);
        }
    }

    /// Add `pin` as GPIO `n`, as an input without pulls
    pub fn add_input(&mut self, n: u8, pin: Peri<'d, AnyPin>) {
        let Some(slot) = self.pins.get_mut(usize::from(n)) else {
            return;
        };
        let mut flex = Flex::new(pin);
        flex.set_as_input();
        flex.set_pull(RpPull::None);
        *slot = Some(flex);
    }

    /// Bits of the pins configured as outputs
    pub fn output_mask(&self) -> u32 {
        self.outputs
    }
}

fn rp_pull(pull: Pull) -> RpPull {
    match pull {
        Pull::None => RpPull::None,
        Pull::Up => RpPull::Up,
        Pull::Down => RpPull::Down,
    }
}

impl GpioPort for FlexPort<'_> {
    fn read(&self) -> u32 {
        self.pins
            .iter()
            .enumerate()
            .filter_map(|(n, p)| p.as_ref().map(|p| (n, p)))
            .fold(0, |acc, (n, p)| if p.is_high() { acc | 1 << n } else { acc })
    }

    #[inline]
    fn write_masked(&mut self, mask: u32, value: u32) {
        let mask = mask & self.outputs;
        let mut bits = mask;
        while bits != 0 {
            let n = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            if let Some(pin) = self.pins[n].as_mut() {
                pin.set_level(Level::from(value & (1 << n) != 0));
            }
        }
        self.state = (self.state & !mask) | (value & mask);
    }

    fn output_state(&self) -> u32 {
        self.state
    }

    fn set_pull(&mut self, pin: u8, pull: Pull) {
        if let Some(Some(p)) = self.pins.get_mut(usize::from(pin)) {
            p.set_pull(rp_pull(pull));
        }
    }
}
