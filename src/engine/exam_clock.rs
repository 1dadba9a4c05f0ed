use chrono::{DateTime, Duration, Utc};

pub fn deadline(started_at: DateTime<Utc>, duration_minutes: i64) -> DateTime<Utc> {
    started_at + Duration::minutes(duration_minutes)
}

/// Countdown for display: `max(0, deadline - now)`, in whole seconds.
pub fn time_left_seconds(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (deadline - now).num_seconds().max(0)
}

pub fn is_expired(deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= deadline
}

/// How long a timer has to sleep before the deadline fires.
pub fn until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> std::time::Duration {
    (deadline - now).to_std().unwrap_or(std::time::Duration::ZERO)
}
