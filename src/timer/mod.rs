//! Dwell timer core
//!
//! The state machine, its lifecycle input, and the display helper the
//! hosting screen renders with.

pub mod dwell_timer;
pub mod format;
pub mod lifecycle;
pub mod navigation;

// Re-export main types
pub use dwell_timer::DwellTimer;
pub use format::format_time;
pub use lifecycle::AppLifecycle;
pub use navigation::NavigationTrigger;
