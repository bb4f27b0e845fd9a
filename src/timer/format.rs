//! Countdown display helpers

/// Render seconds as `MM:SS`; negative input renders as `00:00`
///
/// Minutes are not wrapped into hours, so 6000 seconds is `100:00`.
pub fn format_time(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
