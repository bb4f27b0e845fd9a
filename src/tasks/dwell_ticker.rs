//! Countdown ticker background task

use std::{sync::Weak, time::Duration};

use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use crate::timer::DwellTimer;

/// Periodically recompute the remaining time of the timer's current session
///
/// The task holds only a weak handle, so dropping the timer ends it. It exits
/// as soon as its generation is superseded or the session stops running.
pub async fn dwell_ticker_task(timer: Weak<DwellTimer>, generation: u64, period: Duration) {
    debug!("Starting dwell ticker generation {}", generation);

    let mut ticks = interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the timer has just computed the
    // remaining time itself.
    ticks.tick().await;

    loop {
        ticks.tick().await;

        let Some(timer) = timer.upgrade() else {
            debug!("Dwell timer dropped, ticker {} exiting", generation);
            break;
        };
        if !timer.tick_generation(generation).await {
            break;
        }
    }

    debug!("Dwell ticker generation {} stopped", generation);
}
