// Conversion between the leader's absolute start epoch and local monotonic deadlines.
//
// Epoch time (wall clock) is only used to agree on the start instant across
// machines. Everything after that runs on the local monotonic clock.

use super::state::StartSignal;

// Used when a start signal carries neither a usable epoch nor a usable delay.
pub const FALLBACK_START_DELAY_MS: f64 = 1500.0;

/// Remaining countdown in milliseconds for a received start signal.
///
/// Prefers `start_at - now_epoch_ms`; falls back to `delay_ms`, then to
/// [`FALLBACK_START_DELAY_MS`]. The result is never below `floor_ms`, so a
/// stale or zero start never yields an already-elapsed countdown.
pub fn countdown_remaining_ms(signal: &StartSignal, now_epoch_ms: f64, floor_ms: f64) -> f64 {
    let floor = if floor_ms.is_finite() && floor_ms > 0.0 {
        floor_ms
    } else {
        1.0
    };

    let raw = match signal.start_at {
        Some(start_at) if start_at.is_finite() => start_at - now_epoch_ms,
        _ => match signal.delay_ms {
            Some(delay) if delay.is_finite() => delay,
            _ => FALLBACK_START_DELAY_MS,
        },
    };

    raw.max(floor)
}

/// Local monotonic deadline for a received start signal.
pub fn local_start_deadline(
    signal: &StartSignal,
    now_epoch_ms: f64,
    now_monotonic_ms: f64,
    floor_ms: f64,
) -> f64 {
    now_monotonic_ms + countdown_remaining_ms(signal, now_epoch_ms, floor_ms)
}

/// Whole seconds left on a countdown, as shown to the player.
pub fn countdown_seconds(deadline_ms: f64, now_monotonic_ms: f64) -> u32 {
    let remain = (deadline_ms - now_monotonic_ms).max(0.0);
    (remain / 1000.0).ceil() as u32
}
