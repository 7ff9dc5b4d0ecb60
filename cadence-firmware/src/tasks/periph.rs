//! Peripheral task
//!
//! Applies spindle, coolant and aux output requests, and samples the
//! analog inputs every 100 ms.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Ticker};
use portable_atomic::Ordering;

use cadence_core::periph::{AnalogInputs, AnalogOutputs, Spindle};
use cadence_hal_rp2040::adc::RpAdc;
use cadence_hal_rp2040::pwm::RpPwm;

use crate::channels::{PeriphCommand, ANALOG_LEVELS, PERIPH_CMD};
use crate::tasks::stepper::SharedOutputs;

/// Analog input sampling interval
const ANALOG_POLL_MS: u64 = 100;

pub struct PeriphResources {
    pub outputs: &'static SharedOutputs,
    /// `None` on boards without a spindle PWM pin: on/off only
    pub spindle: Option<Spindle<RpPwm<'static>>>,
    pub analog_out: AnalogOutputs<RpPwm<'static>>,
    pub analog_in: AnalogInputs<RpAdc<'static>>,
}

#[embassy_executor::task]
pub async fn periph_task(res: PeriphResources) -> ! {
    let PeriphResources {
        outputs,
        mut spindle,
        mut analog_out,
        mut analog_in,
    } = res;

    info!(
        "Periph task started (variable spindle: {}, {} analog out, {} analog in)",
        spindle.as_ref().is_some_and(|s| s.is_variable()),
        analog_out.len(),
        analog_in.len()
    );

    let mut ticker = Ticker::every(Duration::from_millis(ANALOG_POLL_MS));
    loop {
        match select(PERIPH_CMD.receive(), ticker.next()).await {
            Either::First(cmd) => {
                debug!("Periph command: {}", cmd);
                match cmd {
                    PeriphCommand::Spindle { state, rpm } => outputs.lock(|o| {
                        let mut o = o.borrow_mut();
                        match spindle.as_mut() {
                            Some(spindle) => spindle.set_state(&mut *o, state, rpm),
                            None => {
                                if state.on {
                                    o.spindle_dir(state.ccw);
                                }
                                o.spindle_enable(state.on);
                            }
                        }
                    }),
                    PeriphCommand::Coolant(state) => {
                        if let Err(e) = outputs.lock(|o| o.borrow_mut().set_coolant(state)) {
                            warn!("Coolant update failed: {}", e);
                        }
                    }
                    PeriphCommand::DigitalOut { port, on } => {
                        if !outputs.lock(|o| o.borrow_mut().digital_out(port, on)) {
                            warn!("No digital output {}", port);
                        }
                    }
                    PeriphCommand::AnalogOut { port, value } => {
                        if !analog_out.analog_out(port, value) {
                            warn!("Analog output {} unavailable", port);
                        }
                    }
                }
            }
            Either::Second(()) => {
                for (port, level) in ANALOG_LEVELS.iter().enumerate() {
                    if let Some(value) = analog_in.analog_in(port as u8) {
                        level.store(value, Ordering::Relaxed);
                    }
                }
            }
        }
    }
}
