//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.

pub mod completion_watch;
pub mod dwell_ticker;
pub mod lifecycle_signals;

// Re-export main functions
pub use completion_watch::completion_watch_task;
pub use dwell_ticker::dwell_ticker_task;
pub use lifecycle_signals::lifecycle_signal_task;
