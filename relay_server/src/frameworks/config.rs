use std::env;

// Runtime/server constants for the relay.

pub fn http_port() -> u16 {
    env::var("RELAY_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(7071)
}

// Websocket base handed out by negotiate; derived from the bound address when unset.
pub fn public_url() -> Option<String> {
    env::var("RELAY_PUBLIC_URL")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn token_ttl_seconds() -> u64 {
    env::var("RELAY_TOKEN_TTL_SECONDS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|ttl| *ttl > 0)
        .unwrap_or(60 * 60)
}
