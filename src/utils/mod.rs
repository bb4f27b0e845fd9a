//! Process-level helpers for the host binary

pub mod signals;

// Re-export main functions
pub use signals::shutdown_signal;
