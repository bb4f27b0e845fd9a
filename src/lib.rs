//! Kompeito Dwell - wall-clock dwell timer for a place-visit game
//!
//! Players travel to a place, stay for a fixed time, then post a review to
//! earn kompeito. This library holds the dwell countdown that gates leaving,
//! its persistence and lifecycle reconciliation, and the progress store that
//! records rewards.

pub mod api;
pub mod config;
pub mod services;
pub mod state;
pub mod tasks;
pub mod timer;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::{Config, DwellConfig};
pub use state::{AppState, ProfileStore, TimerState};
pub use timer::{format_time, AppLifecycle, DwellTimer};
pub use utils::signals::shutdown_signal;
