//! Dwell session identity and its persisted representation

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Seconds a visit must last before the user may leave (ten minutes)
pub const DEFAULT_DURATION_SECONDS: u64 = 10 * 60;

/// Store key holding the wall-clock anchor of the running session
pub const START_TIME_KEY: &str = "@timer_start_time";

/// Store key holding the id of the current session
pub const SESSION_ID_KEY: &str = "@timer_session_id";

/// One continuous attempt to stay at a place for the full duration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub total_duration_seconds: u64,
}

impl Session {
    pub fn new(session_id: String, start_time: DateTime<Utc>, total_duration_seconds: u64) -> Self {
        Self {
            session_id,
            start_time,
            total_duration_seconds,
        }
    }

    /// Whole seconds since `start_time`, as seen at `now`
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        elapsed_seconds(self.start_time, now)
    }

    /// Seconds left at `now`, never below zero
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        remaining_seconds(self.total_duration_seconds, self.elapsed_seconds(now))
    }

    /// Store entries for the anchor and identity; always written together
    pub fn persisted_entries(&self) -> [(&'static str, String); 2] {
        [
            (START_TIME_KEY, encode_start_time(self.start_time)),
            (SESSION_ID_KEY, self.session_id.clone()),
        ]
    }
}

/// `floor((now - start) / 1s)`
pub fn elapsed_seconds(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - start).num_milliseconds().div_euclid(1000)
}

/// `total - elapsed`, clamped into `0..=total`
///
/// A start time in the future (the wall clock was moved backwards) yields
/// the full duration rather than more than it.
pub fn remaining_seconds(total: u64, elapsed: i64) -> u64 {
    let total = i64::try_from(total).unwrap_or(i64::MAX);
    total.saturating_sub(elapsed).clamp(0, total) as u64
}

/// Session ids are the epoch milliseconds at creation.
///
/// When that would collide with `previous` (two sessions in the same
/// millisecond, or a clock that went backwards) the id is bumped until it
/// differs.
pub fn generate_session_id(now: DateTime<Utc>, previous: Option<&str>) -> String {
    let mut candidate = now.timestamp_millis();
    while previous == Some(candidate.to_string().as_str()) {
        candidate += 1;
    }
    candidate.to_string()
}

/// ISO-8601 encoding used for [`START_TIME_KEY`]
pub fn encode_start_time(start_time: DateTime<Utc>) -> String {
    start_time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a persisted start time; anything unparseable is `None`
pub fn decode_start_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
