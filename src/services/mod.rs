//! External collaborators
//!
//! Storage and time are the only things the dwell core reaches outside of
//! itself for. Both sit behind traits so hosts and tests can swap them.

pub mod clock;
pub mod storage;

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StoreError};
