//! Navigation on completion background task

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::{state::TimerState, timer::NavigationTrigger};

/// Watch timer updates and fire the navigation trigger once per finished session
pub async fn completion_watch_task(
    mut updates: watch::Receiver<TimerState>,
    trigger: Arc<dyn NavigationTrigger>,
) {
    info!("Starting completion watch task");

    let mut announced: Option<String> = None;
    loop {
        let finished = {
            let state = updates.borrow_and_update();
            match (&state.current_session_id, state.is_time_up) {
                (Some(id), true) if announced.as_deref() != Some(id.as_str()) => Some(id.clone()),
                _ => None,
            }
        };

        if let Some(session_id) = finished {
            info!("Session {} finished, triggering navigation", session_id);
            trigger.on_time_up(&session_id);
            announced = Some(session_id);
        }

        if updates.changed().await.is_err() {
            debug!("Timer update channel closed, completion watch exiting");
            break;
        }
    }
}
