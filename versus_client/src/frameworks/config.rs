use std::{env, path::PathBuf, time::Duration};

use crate::use_cases::{MatchSettings, ReconnectPolicy, SessionSettings};

// Runtime/session constants (not gameplay tuning).

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_millis(key: &str, default: u64) -> Duration {
    Duration::from_millis(env_u64(key, default))
}

pub fn negotiate_url() -> String {
    env::var("VERSUS_NEGOTIATE_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:7071/api/negotiate".to_string())
}

pub fn room_code() -> String {
    env::var("VERSUS_ROOM").unwrap_or_else(|_| "lobby".to_string())
}

pub fn display_name() -> Option<String> {
    env::var("VERSUS_NAME")
        .ok()
        .filter(|name| !name.trim().is_empty())
}

pub fn profile_path() -> PathBuf {
    env::var("VERSUS_PROFILE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("versus_profile.json"))
}

pub fn negotiate_timeout() -> Duration {
    env_millis("VERSUS_NEGOTIATE_TIMEOUT_MS", 1500)
}

pub fn join_timeout() -> Duration {
    env_millis("VERSUS_JOIN_TIMEOUT_MS", 5000)
}

// Headless run length once the match is running; 0 runs until ctrl-c.
pub fn match_length() -> Option<Duration> {
    match env_u64("VERSUS_MATCH_SECONDS", 0) {
        0 => None,
        seconds => Some(Duration::from_secs(seconds)),
    }
}

pub fn session_settings() -> SessionSettings {
    let defaults = SessionSettings::default();
    SessionSettings {
        settle_delay: env_millis("VERSUS_SETTLE_DELAY_MS", 600),
        countdown_delay: env_millis("VERSUS_COUNTDOWN_DELAY_MS", 2200),
        countdown_floor: env_millis("VERSUS_COUNTDOWN_FLOOR_MS", 300),
        interp_buffer: env_millis("VERSUS_INTERP_BUFFER_MS", 100),
        ..defaults
    }
}

pub fn reconnect_policy() -> ReconnectPolicy {
    ReconnectPolicy {
        max_attempts: env_u64("VERSUS_RECONNECT_ATTEMPTS", 2) as u32,
        backoff: env_millis("VERSUS_RECONNECT_BACKOFF_MS", 1500),
    }
}

pub fn match_settings() -> MatchSettings {
    MatchSettings {
        session: session_settings(),
        reconnect: reconnect_policy(),
        frame_interval: FRAME_INTERVAL,
        match_length: match_length(),
        ..MatchSettings::default()
    }
}

pub const FRAME_INTERVAL: Duration = Duration::from_millis(1000 / 60);
