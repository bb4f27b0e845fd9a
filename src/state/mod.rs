//! State management module
//!
//! This module contains all state-related structures and their management logic.

pub mod app_state;
pub mod profile;
pub mod session;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use profile::{ProfileStore, ReviewRecord, UserProfile};
pub use session::Session;
pub use timer_state::{TimerPhase, TimerState};
