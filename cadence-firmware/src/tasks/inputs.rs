//! Input task
//!
//! Feeds pin events from the watchers into the classifier and services its
//! debounce and latch timers. Resolved events leave through
//! [`crate::channels::EVENTS`].

use defmt::*;
use embassy_futures::select::select;
use embassy_time::{Duration, Timer};

use cadence_core::clock::{ms_until, Clock};
use cadence_core::input::InputClassifier;
use cadence_hal_rp2040::clock::UptimeClock;
use cadence_hal_rp2040::watch::WatchedInputs;

use crate::channels::{ChannelSink, PIN_WATCH, TICKS};

pub type Classifier = InputClassifier<WatchedInputs>;

#[embassy_executor::task]
pub async fn inputs_task(mut classifier: Classifier) -> ! {
    info!(
        "Input task started ({} inputs)",
        classifier.table().inputs().len()
    );

    let clock = Clock::new(&TICKS, UptimeClock);
    let mut sink = ChannelSink;
    let mut dropped = 0;

    loop {
        match classifier.next_deadline() {
            Some(deadline) => {
                // One extra ms so the tick counter has reached the deadline
                let ms = ms_until(clock.elapsed_ticks(), deadline) + 1;
                let _ = select(PIN_WATCH.wait(), Timer::after(Duration::from_millis(u64::from(ms))))
                    .await;
            }
            None => PIN_WATCH.wait().await,
        }

        let now = clock.elapsed_ticks();
        while let Some((pin, events)) = PIN_WATCH.take_next() {
            trace!("GPIO{} events {:#04x}", pin, events.0);
            classifier.on_pin_event(pin, events, now, &mut sink);
        }
        classifier.service_timers(now, &mut sink);

        if classifier.dropped_events() != dropped {
            dropped = classifier.dropped_events();
            warn!("Event queue full, {} events dropped", dropped);
        }
    }
}
