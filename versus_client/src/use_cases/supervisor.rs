// Reconnection supervisor: bounded, serialized retry scheduling.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    /// Attempts allowed per match.
    pub max_attempts: u32,
    /// Fixed delay before each attempt.
    pub backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_millis(1500),
        }
    }
}

/// What the match task should do after a transport event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Start attempt number `attempt` after `delay`.
    Schedule { attempt: u32, delay: Duration },
    /// An attempt is already in flight; do nothing.
    InFlight,
    /// Budget spent; continue without a transport.
    Exhausted,
}

#[derive(Debug)]
pub struct ReconnectSupervisor {
    policy: ReconnectPolicy,
    attempts: u32,
    in_flight: bool,
    exhausted: bool,
}

impl ReconnectSupervisor {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            in_flight: false,
            exhausted: false,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_reconnecting(&self) -> bool {
        self.in_flight
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Transport reported a drop.
    pub fn on_disconnect(&mut self) -> ReconnectDecision {
        if self.in_flight {
            return ReconnectDecision::InFlight;
        }
        self.next_attempt()
    }

    /// The scheduled attempt succeeded; the in-flight guard is released.
    pub fn on_success(&mut self) {
        self.in_flight = false;
    }

    /// The scheduled attempt failed; another is scheduled while budget remains.
    pub fn on_failure(&mut self) -> ReconnectDecision {
        self.in_flight = false;
        self.next_attempt()
    }

    fn next_attempt(&mut self) -> ReconnectDecision {
        if self.exhausted || self.attempts >= self.policy.max_attempts {
            self.exhausted = true;
            return ReconnectDecision::Exhausted;
        }
        self.attempts += 1;
        self.in_flight = true;
        ReconnectDecision::Schedule {
            attempt: self.attempts,
            delay: self.policy.backoff,
        }
    }
}
