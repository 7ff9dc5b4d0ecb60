//! Cadence - CNC Motion Core Firmware
//!
//! Real-time step generation and input handling for RP2040-based CNC
//! controller boards. The board's pin map is compiled in from
//! `board.toml`; driver settings start from their defaults.

#![no_std]
#![no_main]

use core::cell::RefCell;

use defmt::*;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::adc::{Adc, Config as AdcConfig};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::AnyPin;
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::{InterruptHandler as PioInterruptHandler, Pio};
use embassy_rp::Peri;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Timer};
use heapless::Vec;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use cadence_core::config::DriverSettings;
use cadence_core::periph::{AnalogInputs, AnalogOutputs, Outputs, Spindle};
use cadence_core::signals::{Axis, Motor, PortKind, SignalTable};
use cadence_core::stepper::{MotorMap, PulseGenerator, StepperControl, StepperTimer};
use cadence_drivers::output::{GpioOutputs, OutputMap};
use cadence_drivers::step::SequencerBackend;
use cadence_hal_rp2040::adc::RpAdc;
use cadence_hal_rp2040::pins::PinBank;
use cadence_hal_rp2040::pio::{PioSequencer, PioTickTimer, MAX_STEP_PINS};
use cadence_hal_rp2040::port::FlexPort;
use cadence_hal_rp2040::watch::{PinWatcher, WatchedInputs};
use cadence_hal_rp2040::SYS_CLK_HZ;

use crate::channels::{analog_level, PIN_WATCH, STATUS, STATUS_STEPPING};
use crate::tasks::stepper::SharedOutputs;

mod board;
mod channels;
mod tasks;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});

/// High-priority executor for the step tick
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_HIGH.on_interrupt()
}

static OUTPUTS: StaticCell<SharedOutputs> = StaticCell::new();

/// Park the core after a fatal setup error
fn halt() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

fn take_pin(bank: &mut PinBank, pin: u8) -> Option<Peri<'static, AnyPin>> {
    match bank.take(pin) {
        Ok(io) => Some(io),
        Err(e) => {
            error!("Pin setup failed: {}", e);
            None
        }
    }
}

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Cadence firmware starting...");

    let p = embassy_rp::init(Default::default());
    let (mut bank, periph) = board::split(p);
    info!("Board: {} ({} pins)", board::BOARD_NAME, board::BOARD_PINS.len());

    let settings = DriverSettings::default();

    let table = match SignalTable::from_board(board::BOARD_PINS) {
        Ok(table) => table,
        Err(e) => {
            error!("Invalid pin table: {}", e);
            halt();
        }
    };

    let map = match MotorMap::from_table(&table) {
        Ok(map) => map,
        Err(e) => {
            error!("Invalid stepper pins: {}", e);
            halt();
        }
    };
    let ganged = map.ganged();

    // Step outputs: one consecutive window for the sequencer
    let mut step_pins: Vec<u8, 12> = Vec::new();
    let mut dir_port = FlexPort::new();
    for axis in Axis::ALL {
        for motor in [Motor::Primary, Motor::Secondary] {
            if let Some(pin) = map.step_pin(axis, motor) {
                let _ = step_pins.push(pin);
            }
            if let Some(pin) = map.dir_pin(axis, motor) {
                if let Some(io) = take_pin(&mut bank, pin) {
                    dir_port.add_output(pin, io, false);
                }
            }
        }
    }
    let mut seq_pins: Vec<Peri<'static, AnyPin>, MAX_STEP_PINS> = Vec::new();
    if let (Some(&lo), Some(&hi)) = (step_pins.iter().min(), step_pins.iter().max()) {
        for pin in lo..=hi {
            if let Some(io) = take_pin(&mut bank, pin) {
                let _ = seq_pins.push(io);
            }
        }
    }

    let Pio {
        mut common,
        irq0,
        sm0,
        sm1,
        ..
    } = Pio::new(periph.pio0, Irqs);
    let sequencer = PioSequencer::new(&mut common, sm0, seq_pins);
    let tick_timer = PioTickTimer::new(&mut common, sm1);
    info!("PIO sequencer and tick timer initialized");

    let pulses = match SequencerBackend::new(sequencer, dir_port, map)
        .and_then(|backend| PulseGenerator::new(backend, &settings.steppers, ganged))
    {
        Ok(pulses) => pulses,
        Err(e) => {
            error!("Step output setup failed: {}", e);
            halt();
        }
    };

    // Discrete outputs on GPIO
    let output_map = OutputMap::from_table(&table, PortKind::Gpio);
    let mut output_port = FlexPort::new();
    for pin in 0..cadence_hal_rp2040::NUM_GPIO as u8 {
        if output_map.mask() & (1 << pin) != 0 {
            if let Some(io) = take_pin(&mut bank, pin) {
                output_port.add_output(pin, io, false);
            }
        }
    }
    let mut outputs = Outputs::new(GpioOutputs::new(output_port, output_map), &settings);

    let spindle = periph.spindle_pwm.map(|pwm| {
        let mut spindle = Spindle::new(pwm);
        if let Err(e) = spindle.configure(&settings.spindle, SYS_CLK_HZ, &mut outputs) {
            warn!("Spindle is on/off only: {}", e);
        }
        spindle
    });
    let outputs: &'static SharedOutputs = OUTPUTS.init(Mutex::new(RefCell::new(outputs)));

    let mut analog_out = AnalogOutputs::new();
    for (port, pwm) in periph.analog_out {
        if let Err(e) = analog_out.add(port, pwm) {
            warn!("Analog output {}: {}", port, e);
        }
    }
    if let Err(e) = analog_out.configure(SYS_CLK_HZ) {
        warn!("Analog output setup failed: {}", e);
    }

    let mut adc = RpAdc::new(Adc::new_blocking(periph.adc, AdcConfig::default()));
    for (pin, channel) in periph.analog_in {
        if !adc.add(pin, channel) {
            warn!("No room for ADC channel on GPIO{}", pin);
        }
    }
    let analog_in = match AnalogInputs::new(adc, &table) {
        Ok(analog_in) => analog_in,
        Err(e) => {
            error!("Analog input setup failed: {}", e);
            halt();
        }
    };
    info!("Outputs initialized");

    // One watcher per GPIO input
    let mut watchers: Vec<PinWatcher<'static>, { cadence_hal_rp2040::NUM_GPIO }> = Vec::new();
    for input in table.inputs().iter().filter(|i| i.port == PortKind::Gpio) {
        if let Some(io) = take_pin(&mut bank, input.pin) {
            let _ = watchers.push(PinWatcher::new(input.pin, io, &PIN_WATCH));
        }
    }
    let classifier =
        tasks::Classifier::new(table, WatchedInputs::new(&PIN_WATCH), &settings);
    info!("{} inputs watched", watchers.len());

    // Step tick on the interrupt executor
    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let spawner_high = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);
    spawner_high
        .spawn(tasks::stepper_task(tasks::StepperResources {
            control: StepperControl::new(pulses, StepperTimer::new(tick_timer)),
            tick_irq: irq0,
            outputs,
        }))
        .unwrap();

    spawner.spawn(tasks::systick_task()).unwrap();
    for watcher in watchers {
        spawner.spawn(tasks::pin_watch_task(watcher)).unwrap();
    }
    spawner.spawn(tasks::inputs_task(classifier)).unwrap();
    spawner.spawn(tasks::events_task()).unwrap();
    spawner
        .spawn(tasks::periph_task(tasks::PeriphResources {
            outputs,
            spindle,
            analog_out,
            analog_in,
        }))
        .unwrap();

    info!("All tasks spawned");

    loop {
        Timer::after(Duration::from_secs(5)).await;
        info!(
            "Heartbeat: stepping={}, analog in 0={}",
            STATUS.get() & STATUS_STEPPING != 0,
            analog_level(0)
        );
    }
}
