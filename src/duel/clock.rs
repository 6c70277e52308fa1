//! Round countdown derived purely from the shared `round_start_time` and
//! a clock reading, so clients need no synchronized ticking. The session
//! maps the remaining time onto one cancellable tokio deadline per round.

use chrono::{DateTime, Utc};
use tokio::time::{Duration, Instant};

/// Milliseconds elapsed in the round at `now`, floored at zero.
pub fn elapsed_ms(round_start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - round_start).num_milliseconds().max(0)
}

/// Milliseconds of round time left: `max(0, duration − (now − start))`.
pub fn remaining_ms(round_start: DateTime<Utc>, now: DateTime<Utc>, round_duration_ms: i64) -> i64 {
    (round_duration_ms - elapsed_ms(round_start, now)).max(0)
}

/// Tokio deadline at which the round buzzer fires. An already-expired
/// round yields a deadline in the immediate present.
pub fn round_deadline(
    round_start: DateTime<Utc>,
    now: DateTime<Utc>,
    round_duration_ms: i64,
) -> Instant {
    Instant::now() + Duration::from_millis(remaining_ms(round_start, now, round_duration_ms) as u64)
}
