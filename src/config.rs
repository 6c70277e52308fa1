//! Runtime configuration for the QuizClash duel server.

use once_cell::sync::Lazy;
use std::env;

#[derive(Debug)]
pub struct Settings {
    /// Length of one answer window (milliseconds).
    pub round_duration_ms: i64,
    /// Fixed pause on the round-result display before the next round.
    pub round_result_pause_ms: u64,
    /// Redis duel-snapshot TTL (seconds).
    pub snapshot_ttl: u64,
}

impl Settings {
    fn from_env() -> Self {
        let round_duration_ms = env::var("ROUND_DURATION_MS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(15_000);

        let round_result_pause_ms = env::var("ROUND_RESULT_PAUSE_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(2_000);

        let snapshot_ttl = env::var("SNAPSHOT_TTL")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(3_600); // 1 h default

        Settings {
            round_duration_ms,
            round_result_pause_ms,
            snapshot_ttl,
        }
    }
}

static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);

pub fn settings() -> &'static Settings {
    &SETTINGS
}
