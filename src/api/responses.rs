//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    state::{ReviewRecord, TimerPhase, TimerState, UserProfile},
    timer::{format_time, AppLifecycle},
};

/// Timer state as the hosting screen renders it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerResponse {
    pub phase: TimerPhase,
    pub display: String,
    pub timer: TimerState,
    pub timestamp: DateTime<Utc>,
}

impl TimerResponse {
    pub fn new(timer: TimerState) -> Self {
        Self {
            phase: timer.phase(),
            display: format_time(timer.remaining_seconds as i64),
            timer,
            timestamp: Utc::now(),
        }
    }
}

/// Body of POST /lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleRequest {
    pub state: AppLifecycle,
}

/// Where the client should go next
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResponse {
    pub next_route: String,
    pub timestamp: DateTime<Utc>,
}

impl NavigationResponse {
    pub fn to(next_route: String) -> Self {
        Self {
            next_route,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub next_route: String,
    pub kompeito_awarded: u64,
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewedResponse {
    pub place_id: String,
    pub reviewed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewsResponse {
    pub reviews: Vec<ReviewRecord>,
    pub reviewed_places: Vec<String>,
}

/// Status response with timer and visit information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub timer: TimerResponse,
    pub current_place: Option<String>,
    pub pending_route: Option<String>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
