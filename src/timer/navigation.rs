//! Hook for advancing the user once a visit is complete

/// Invoked once per session when its countdown reaches zero
pub trait NavigationTrigger: Send + Sync {
    fn on_time_up(&self, session_id: &str);
}
