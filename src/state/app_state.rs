//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::ProfileStore;
use crate::timer::{DwellTimer, NavigationTrigger};

/// Main application state shared by the HTTP handlers and background tasks
pub struct AppState {
    /// The dwell countdown for the current visit
    pub timer: Arc<DwellTimer>,
    /// Kompeito and review bookkeeping
    pub profile: ProfileStore,
    pub kompeito_per_review: u64,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Place whose timer screen was focused last
    pub current_place: Arc<Mutex<Option<String>>>,
    /// Route the client should move to next, set when a visit completes
    pub pending_route: Arc<Mutex<Option<String>>>,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    pub fn new(
        timer: Arc<DwellTimer>,
        profile: ProfileStore,
        kompeito_per_review: u64,
        port: u16,
        host: String,
    ) -> Self {
        Self {
            timer,
            profile,
            kompeito_per_review,
            start_time: Instant::now(),
            port,
            host,
            current_place: Arc::new(Mutex::new(None)),
            pending_route: Arc::new(Mutex::new(None)),
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
        }
    }

    /// Remember the last action taken by the client
    pub fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Record the focused place; returns `true` when it differs from the last one
    pub fn set_current_place(&self, place_id: &str) -> Result<bool, String> {
        let mut place = self.current_place.lock()
            .map_err(|e| format!("Failed to lock current place: {}", e))?;
        if place.as_deref() == Some(place_id) {
            return Ok(false);
        }
        info!("Now visiting place {}", place_id);
        *place = Some(place_id.to_string());
        Ok(true)
    }

    pub fn get_current_place(&self) -> Result<Option<String>, String> {
        self.current_place.lock()
            .map(|place| place.clone())
            .map_err(|e| format!("Failed to lock current place: {}", e))
    }

    pub fn get_pending_route(&self) -> Result<Option<String>, String> {
        self.pending_route.lock()
            .map(|route| route.clone())
            .map_err(|e| format!("Failed to lock pending route: {}", e))
    }

    pub fn clear_pending_route(&self) -> Result<(), String> {
        let mut route = self.pending_route.lock()
            .map_err(|e| format!("Failed to lock pending route: {}", e))?;
        *route = None;
        Ok(())
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}

/// Route to the review step for `place_id`
pub fn review_route(place_id: Option<&str>) -> String {
    match place_id {
        Some(place_id) => format!("/{}/review", place_id),
        None => "/review".to_string(),
    }
}

impl NavigationTrigger for AppState {
    fn on_time_up(&self, session_id: &str) {
        if self.timer.snapshot().current_session_id.as_deref() != Some(session_id) {
            debug!("Session {} is no longer tracked, not navigating", session_id);
            return;
        }
        let place = self.get_current_place().ok().flatten();
        let route = review_route(place.as_deref());
        info!("Session {} complete, next step is {}", session_id, route);
        if let Ok(mut pending) = self.pending_route.lock() {
            *pending = Some(route);
        }
    }
}
