//! Lifecycle signal background task

use std::sync::Arc;

use futures::stream::StreamExt;
use signal_hook::consts::{SIGUSR1, SIGUSR2};
use signal_hook_tokio::Signals;
use tracing::{error, info};

use crate::timer::{AppLifecycle, DwellTimer};

/// Lifecycle transition delivered by a process signal
pub fn lifecycle_for_signal(signal: i32) -> Option<AppLifecycle> {
    match signal {
        SIGUSR1 => Some(AppLifecycle::Background),
        SIGUSR2 => Some(AppLifecycle::Active),
        _ => None,
    }
}

/// Forward SIGUSR1 (background) and SIGUSR2 (active) to the timer
pub async fn lifecycle_signal_task(timer: Arc<DwellTimer>) {
    let mut signals = match Signals::new([SIGUSR1, SIGUSR2]) {
        Ok(signals) => signals,
        Err(e) => {
            error!("Failed to register lifecycle signal handlers: {}", e);
            return;
        }
    };
    info!("Starting lifecycle signal task");

    while let Some(signal) = signals.next().await {
        if let Some(next) = lifecycle_for_signal(signal) {
            info!("Received signal {}, app is now {}", signal, next);
            timer.handle_lifecycle_change(next).await;
        }
    }
}
