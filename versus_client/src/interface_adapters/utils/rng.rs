use crate::domain::PeerId;
use rand::Rng;
use std::{
    sync::{
        OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const PEER_ID_LEN: usize = 6;
const PID_SUFFIX_LEN: usize = 4;

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Returns a process-unique, monotonically increasing identifier.
///
/// Used to tell transport instances apart inside one process.
pub fn rand_id() -> u64 {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| AtomicU64::new(now_nanos()));
    counter.fetch_add(1, Ordering::Relaxed)
}

fn base36<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect()
}

/// Short random peer id; collisions only matter for the leader tie-break.
pub fn peer_id<R: Rng + ?Sized>(rng: &mut R) -> PeerId {
    PeerId::new(base36(rng, PEER_ID_LEN))
}

/// Power-up event id: sender epoch milliseconds plus a short random suffix.
pub fn power_up_pid<R: Rng + ?Sized>(rng: &mut R, epoch_ms: f64) -> String {
    format!("{}-{}", epoch_ms.max(0.0) as u64, base36(rng, PID_SUFFIX_LEN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn when_peer_id_is_generated_then_it_is_six_base36_chars() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = peer_id(&mut rng);
        assert_eq!(id.as_str().len(), PEER_ID_LEN);
        assert!(id.as_str().bytes().all(|b| BASE36.contains(&b)));
    }

    #[test]
    fn when_pid_is_generated_then_it_has_epoch_prefix_and_suffix() {
        let mut rng = StdRng::seed_from_u64(7);
        let pid = power_up_pid(&mut rng, 1_700_000_000_123.0);
        let (epoch, suffix) = pid.split_once('-').expect("expected dash separator");
        assert_eq!(epoch, "1700000000123");
        assert_eq!(suffix.len(), PID_SUFFIX_LEN);
    }

    #[test]
    fn when_rand_id_is_called_twice_then_values_differ() {
        assert_ne!(rand_id(), rand_id());
    }
}
