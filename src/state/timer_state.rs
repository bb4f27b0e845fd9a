//! Timer state observed by the hosting screen

use serde::{Deserialize, Serialize};

use super::session::DEFAULT_DURATION_SECONDS;

/// Coarse phase of the dwell state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    /// No session is being counted down
    Idle,
    /// A session is counting down (possibly paused while backgrounded)
    Running,
    /// The countdown reached zero; terminal until reset
    TimeUp,
}

/// In-memory view of the current dwell session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub remaining_seconds: u64,
    pub is_running: bool,
    pub is_time_up: bool,
    /// Session this instance tracks; `None` until the first start
    pub current_session_id: Option<String>,
}

impl TimerState {
    /// Idle state with a full countdown
    pub fn new(total_duration_seconds: u64) -> Self {
        Self {
            remaining_seconds: total_duration_seconds,
            is_running: false,
            is_time_up: false,
            current_session_id: None,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        if self.is_time_up {
            TimerPhase::TimeUp
        } else if self.is_running {
            TimerPhase::Running
        } else {
            TimerPhase::Idle
        }
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION_SECONDS)
    }
}
