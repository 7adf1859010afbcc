// Domain-level identities, session vocabulary and world-event payloads.

use std::fmt;

/// Locally generated identity of one peer for the lifetime of a scene.
///
/// Ordering is plain lexicographic string ordering; it is the tie-break rule
/// both peers use to agree on a leader without negotiating.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomCodeError {
    Empty,
    TooLong,
    InvalidCharacter,
}

impl fmt::Display for RoomCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomCodeError::Empty => write!(f, "room code is empty"),
            RoomCodeError::TooLong => {
                write!(f, "room code is longer than {MAX_ROOM_LEN} characters")
            }
            RoomCodeError::InvalidCharacter => write!(f, "room code contains invalid characters"),
        }
    }
}

impl std::error::Error for RoomCodeError {}

const MAX_ROOM_LEN: usize = 32;

/// Short human-shareable room code, normalized to lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    pub fn parse(raw: &str) -> Result<Self, RoomCodeError> {
        let code = raw.trim().to_lowercase();
        if code.is_empty() {
            return Err(RoomCodeError::Empty);
        }
        if code.chars().count() > MAX_ROOM_LEN {
            return Err(RoomCodeError::TooLong);
        }
        if !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        {
            return Err(RoomCodeError::InvalidCharacter);
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Channel/group key used on the relay.
    pub fn group(&self) -> String {
        format!("room:{}", self.0)
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Undetermined,
    Leader,
    Follower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    CountingDown,
    Running,
}

/// Presence indicator derived from time since the last inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Aging,
    Stale,
}

/// Elects the local role against a remote id.
///
/// The lower id leads. Both peers evaluate this independently and land on
/// complementary roles. Identical ids cannot be ordered and stay undetermined.
pub fn elect_role(local: &PeerId, remote: &PeerId) -> Role {
    match local.cmp(remote) {
        std::cmp::Ordering::Less => Role::Leader,
        std::cmp::Ordering::Greater => Role::Follower,
        std::cmp::Ordering::Equal => Role::Undetermined,
    }
}

/// One `state` snapshot of a peer's simulated entity.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    // Sender-local monotonic clock in milliseconds.
    pub t: f64,
    pub x: f64,
    pub y: f64,
    pub vy: f64,
    pub score: u32,
    pub hp: i32,
    pub name: Option<String>,
}

/// Reconciled remote pose consumed by the render/physics step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub vy: f64,
    pub score: u32,
    pub hp: i32,
}

impl Default for Pose {
    fn default() -> Self {
        // Matches the second player's spawn point in the playfield.
        Self {
            x: 120.0,
            y: 220.0,
            vy: 0.0,
            score: 0,
            hp: 3,
        }
    }
}

/// Leader-authoritative obstacle pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleSpawn {
    pub w: f64,
    pub gap: f64,
    pub top_h: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerKind {
    Heal,
    Shield,
    Rapid,
    Multishot,
    Bigshot,
    Slowmo,
    Magnet,
}

impl PowerKind {
    pub const ALL: [PowerKind; 7] = [
        PowerKind::Heal,
        PowerKind::Shield,
        PowerKind::Rapid,
        PowerKind::Multishot,
        PowerKind::Bigshot,
        PowerKind::Slowmo,
        PowerKind::Magnet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PowerKind::Heal => "heal",
            PowerKind::Shield => "shield",
            PowerKind::Rapid => "rapid",
            PowerKind::Multishot => "multishot",
            PowerKind::Bigshot => "bigshot",
            PowerKind::Slowmo => "slowmo",
            PowerKind::Magnet => "magnet",
        }
    }
}

/// Leader-authoritative power-up spawn, keyed by `pid` for idempotent removal.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpawn {
    pub pid: String,
    pub kind: PowerKind,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
}

/// Cosmetic projectile replication.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSpawn {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub w: Option<f64>,
    pub h: Option<f64>,
    pub color: Option<String>,
}

/// World event captured while the match is not running yet.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Obstacle(ObstacleSpawn),
    PowerUp(PowerSpawn),
}

/// Payload of a synchronized countdown start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartSignal {
    // Sender-local monotonic clock at send time.
    pub t: f64,
    // Absolute epoch milliseconds; authoritative when present and finite.
    pub start_at: Option<f64>,
    // Relative fallback delay in milliseconds.
    pub delay_ms: Option<f64>,
}

/// Observable session state owned by the lobby state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub role: Role,
    pub phase: Phase,
    // Local monotonic deadline of the countdown, set while counting down.
    pub start_at_local: Option<f64>,
    pub remote_peer_id: Option<PeerId>,
    pub remote_name: Option<String>,
    // Local monotonic time of the last inbound message of any kind.
    pub last_message_at: Option<f64>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            role: Role::Undetermined,
            phase: Phase::Waiting,
            start_at_local: None,
            remote_peer_id: None,
            remote_name: None,
            last_message_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_ids_differ_then_exactly_one_peer_leads() {
        let pairs = [("aaa", "zzz"), ("k3j9x1", "k3j9x2"), ("Z", "a"), ("abc", "abcd")];
        for (a, b) in pairs {
            let a = PeerId::new(a);
            let b = PeerId::new(b);
            let from_a = elect_role(&a, &b);
            let from_b = elect_role(&b, &a);
            assert_ne!(from_a, Role::Undetermined);
            assert_ne!(from_b, Role::Undetermined);
            assert_ne!(from_a, from_b, "roles must be complementary for {a} / {b}");
        }
    }

    #[test]
    fn when_aaa_meets_zzz_then_aaa_leads_and_zzz_follows() {
        let aaa = PeerId::new("aaa");
        let zzz = PeerId::new("zzz");
        assert_eq!(elect_role(&aaa, &zzz), Role::Leader);
        assert_eq!(elect_role(&zzz, &aaa), Role::Follower);
    }

    #[test]
    fn when_ids_are_equal_then_role_stays_undetermined() {
        let id = PeerId::new("same");
        assert_eq!(elect_role(&id, &id.clone()), Role::Undetermined);
    }

    #[test]
    fn when_room_code_has_mixed_case_then_it_is_lowercased() {
        let room = RoomCode::parse("  AbC-12 ").expect("expected valid room code");
        assert_eq!(room.as_str(), "abc-12");
        assert_eq!(room.group(), "room:abc-12");
    }

    #[test]
    fn when_room_code_is_blank_then_returns_empty() {
        assert_eq!(RoomCode::parse("   "), Err(RoomCodeError::Empty));
    }

    #[test]
    fn when_room_code_has_symbols_then_returns_invalid_character() {
        assert_eq!(RoomCode::parse("room!"), Err(RoomCodeError::InvalidCharacter));
    }

    #[test]
    fn when_room_code_exceeds_limit_then_returns_too_long() {
        assert_eq!(RoomCode::parse(&"a".repeat(33)), Err(RoomCodeError::TooLong));
    }
}
