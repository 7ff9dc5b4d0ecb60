//! Stepper task
//!
//! Runs on the interrupt executor. Each PIO tick asks the planner's queue
//! for one step command and hands it to the pulse generator; the sequencer
//! times the pulse itself.

use core::cell::RefCell;

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::Irq;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use cadence_core::periph::Outputs;
use cadence_core::stepper::{StepperCommand, StepperControl};
use cadence_drivers::output::GpioOutputs;
use cadence_drivers::step::SequencerBackend;
use cadence_hal_rp2040::pio::{PioSequencer, PioTickTimer};
use cadence_hal_rp2040::port::FlexPort;

use crate::channels::{QueuedSteps, STATUS, STATUS_STEPPING, STEPPER_CMD};

pub type StepControl = StepperControl<
    SequencerBackend<PioSequencer<'static, PIO0, 0>, FlexPort<'static>>,
    PioTickTimer<'static, PIO0, 1>,
>;

/// Discrete outputs shared by the stepper and periph tasks
pub type SharedOutputs =
    Mutex<CriticalSectionRawMutex, RefCell<Outputs<GpioOutputs<FlexPort<'static>>>>>;

pub struct StepperResources {
    pub control: StepControl,
    /// Raised by the tick state machine
    pub tick_irq: Irq<'static, PIO0, 0>,
    pub outputs: &'static SharedOutputs,
}

fn apply(control: &mut StepControl, outputs: &SharedOutputs, cmd: StepperCommand) {
    debug!("Stepper command: {}", cmd);
    outputs.lock(|o| control.apply(cmd, &mut *o.borrow_mut()));
    if control.timer.is_running() {
        STATUS.set_bits(STATUS_STEPPING);
    } else {
        STATUS.clear_bits(STATUS_STEPPING);
    }
}

#[embassy_executor::task]
pub async fn stepper_task(res: StepperResources) -> ! {
    let StepperResources {
        mut control,
        mut tick_irq,
        outputs,
    } = res;
    let mut steps = QueuedSteps;

    info!(
        "Stepper task started (base GPIO{}, pulse {} us)",
        control.pulses.backend().base_pin(),
        control.pulses.timing().length_us()
    );

    loop {
        match select(tick_irq.wait(), STEPPER_CMD.receive()).await {
            Either::First(()) => control.on_tick(&mut steps),
            Either::Second(cmd) => {
                apply(&mut control, outputs, cmd);
                while let Ok(cmd) = STEPPER_CMD.try_receive() {
                    apply(&mut control, outputs, cmd);
                }
            }
        }
    }
}
