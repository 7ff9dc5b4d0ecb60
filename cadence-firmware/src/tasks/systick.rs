//! 1 ms system tick
//!
//! Drives the millisecond counter the classifier uses for debounce and
//! latch deadlines.

use defmt::*;
use embassy_time::{Duration, Ticker};

use crate::channels::TICKS;

#[embassy_executor::task]
pub async fn systick_task() -> ! {
    info!("Systick task started");

    let mut ticker = Ticker::every(Duration::from_millis(1));
    loop {
        ticker.next().await;
        TICKS.tick();
    }
}
