//! Per-pin input watchers

use cadence_hal_rp2040::watch::PinWatcher;

/// Watch one input pin for its armed trigger, at most one per GPIO
#[embassy_executor::task(pool_size = 30)]
pub async fn pin_watch_task(mut watcher: PinWatcher<'static>) -> ! {
    watcher.run().await
}
