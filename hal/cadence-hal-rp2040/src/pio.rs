//! PIO step sequencer and step tick timer
//!
//! Both state machines run at 10 MHz, so one PIO cycle is 0.1 µs: the unit
//! of the step pulse delay and length fields.

use embassy_rp::gpio::{AnyPin, Level};
use embassy_rp::pio::{
    Common, Config, Direction as PioDirection, Instance, Pin, ShiftConfig, ShiftDirection,
    StateMachine,
};
use embassy_rp::Peri;
use fixed::types::U24F8;
use heapless::Vec;

use cadence_hal::{StepSequencer, TickTimer};

use crate::SYS_CLK_HZ;

/// PIO clock for the sequencer and the tick timer
pub const PIO_CLK_HZ: u32 = 10_000_000;

/// Step outputs driven by the sequencer
pub const MAX_STEP_PINS: usize = 6;

/// Cycles the tick loop spends outside the countdown
const TICK_OVERHEAD: u32 = 4;

/// Clock divider for `freq_hz` as 16.8 fixed point
///
/// Returns (integer_part, fractional_part).
pub fn calc_clock_divider(freq_hz: u32) -> (u16, u8) {
    if freq_hz == 0 {
        return (0xFFFF, 0xFF);
    }
    let divider_x256 = (u64::from(SYS_CLK_HZ) * 256) / u64::from(freq_hz);
    let int_part = (divider_x256 / 256).min(0xFFFF) as u16;
    let frac_part = (divider_x256 % 256) as u8;
    (int_part, frac_part)
}

fn divider(freq_hz: u32) -> U24F8 {
    let (int_div, frac_div) = calc_clock_divider(freq_hz);
    U24F8::from_bits((u32::from(int_div) << 8) | u32::from(frac_div))
}

/// Step pulse sequencer on one state machine
///
/// Each 32-bit command word: delay (8), length (8), pin levels during the
/// pulse (6), pin levels after it (6).
pub struct PioSequencer<'d, PIO: Instance, const SM: usize> {
    sm: StateMachine<'d, PIO, SM>,
    pins: Vec<Pin<'d, PIO>, MAX_STEP_PINS>,
    overruns: u32,
}

impl<'d, PIO: Instance, const SM: usize> PioSequencer<'d, PIO, SM> {
    /// Load the sequencer program and take `pins` as consecutive outputs
    ///
    /// `pins` must be consecutive GPIOs starting at the lowest step pin.
    pub fn new(
        common: &mut Common<'d, PIO>,
        mut sm: StateMachine<'d, PIO, SM>,
        pins: Vec<Peri<'d, AnyPin>, MAX_STEP_PINS>,
    ) -> Self {
        let prg = pio::pio_asm!(
            ".wrap_target",
            "    pull block",
            "    out x, 8",
            "delay:",
            "    jmp x-- delay",
            "    out x, 8",
            "    out pins, 6",
            "length:",
            "    jmp x-- length",
            "    out pins, 6",
            ".wrap"
        );
        let installed = common.load_program(&prg.program);

        let mut pio_pins: Vec<Pin<'d, PIO>, MAX_STEP_PINS> = Vec::new();
        for pin in pins {
            let _ = pio_pins.push(common.make_pio_pin(pin));
        }
        let pin_refs: Vec<&Pin<'d, PIO>, MAX_STEP_PINS> = pio_pins.iter().collect();

        let mut cfg = Config::default();
        cfg.use_program(&installed, &[]);
        cfg.set_out_pins(&pin_refs);
        cfg.shift_out = ShiftConfig {
            auto_fill: false,
            threshold: 32,
            direction: ShiftDirection::Right,
        };
        cfg.clock_divider = divider(PIO_CLK_HZ);

        sm.set_config(&cfg);
        sm.set_pin_dirs(PioDirection::Out, &pin_refs);
        sm.set_pins(Level::Low, &pin_refs);
        sm.set_enable(true);

        Self {
            sm,
            pins: pio_pins,
            overruns: 0,
        }
    }

    /// Commands dropped because the FIFO was full
    pub fn overruns(&self) -> u32 {
        self.overruns
    }
}

impl<PIO: Instance, const SM: usize> StepSequencer for PioSequencer<'_, PIO, SM> {
    #[inline]
    fn push(&mut self, word: u32) {
        if !self.sm.tx().try_push(word) {
            self.overruns = self.overruns.wrapping_add(1);
        }
    }

    fn force_level(&mut self, bits: u32) {
        for (i, pin) in self.pins.iter().enumerate() {
            self.sm
                .set_pins(Level::from(bits & (1 << i) != 0), &[pin]);
        }
    }
}

/// Step tick timer on one state machine
///
/// Counts down the period and raises PIO IRQ 0. The last period pushed is
/// reused until a new one arrives.
pub struct PioTickTimer<'d, PIO: Instance, const SM: usize> {
    sm: StateMachine<'d, PIO, SM>,
}

impl<'d, PIO: Instance, const SM: usize> PioTickTimer<'d, PIO, SM> {
    pub fn new(common: &mut Common<'d, PIO>, mut sm: StateMachine<'d, PIO, SM>) -> Self {
        let prg = pio::pio_asm!(
            ".wrap_target",
            "    pull noblock",
            "    mov x, osr",
            "    mov y, x",
            "count:",
            "    jmp y-- count",
            "    irq 0",
            ".wrap"
        );
        let installed = common.load_program(&prg.program);

        let mut cfg = Config::default();
        cfg.use_program(&installed, &[]);
        cfg.clock_divider = divider(PIO_CLK_HZ);
        sm.set_config(&cfg);

        Self { sm }
    }
}

impl<PIO: Instance, const SM: usize> TickTimer for PioTickTimer<'_, PIO, SM> {
    fn frequency_hz(&self) -> u32 {
        PIO_CLK_HZ
    }

    fn set_period(&mut self, cycles: u32) {
        let _ = self
            .sm
            .tx()
            .try_push(cycles.saturating_sub(TICK_OVERHEAD));
    }

    fn start(&mut self) {
        self.sm.set_enable(true);
    }

    fn stop(&mut self) {
        self.sm.set_enable(false);
        self.sm.clear_fifos();
        self.sm.restart();
    }
}
