//! Event log
//!
//! Stand-in consumer of the signal event queue until a planner claims it.

use defmt::*;

use crate::channels::EVENTS;

#[embassy_executor::task]
pub async fn events_task() -> ! {
    info!("Event task started");

    loop {
        let event = EVENTS.receive().await;
        info!("Signal event: {}", event);
    }
}
