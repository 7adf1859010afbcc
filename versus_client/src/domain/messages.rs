// Closed set of messages two peers exchange inside a room.

use super::state::{
    ObstacleSpawn, PeerId, PlayerSnapshot, PowerSpawn, ProjectileSpawn, RoomCode, StartSignal,
};

/// Peer-to-peer message after it passed the decode boundary.
///
/// Every variant carries the sender id so receivers can drop their own echoes.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerMessage {
    Join {
        id: PeerId,
        room: RoomCode,
        name: Option<String>,
    },
    Leave {
        id: PeerId,
        room: RoomCode,
    },
    State {
        id: PeerId,
        snapshot: PlayerSnapshot,
    },
    Spawn {
        id: PeerId,
        t: f64,
        obstacle: ObstacleSpawn,
    },
    PowerSpawn {
        id: PeerId,
        t: f64,
        power: PowerSpawn,
    },
    Pickup {
        id: PeerId,
        t: f64,
        pid: String,
    },
    Shoot {
        id: PeerId,
        t: f64,
        projectile: ProjectileSpawn,
    },
    Start {
        id: PeerId,
        room: RoomCode,
        signal: StartSignal,
    },
}

impl PeerMessage {
    pub fn sender(&self) -> &PeerId {
        match self {
            PeerMessage::Join { id, .. }
            | PeerMessage::Leave { id, .. }
            | PeerMessage::State { id, .. }
            | PeerMessage::Spawn { id, .. }
            | PeerMessage::PowerSpawn { id, .. }
            | PeerMessage::Pickup { id, .. }
            | PeerMessage::Shoot { id, .. }
            | PeerMessage::Start { id, .. } => id,
        }
    }

    /// Short kind label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PeerMessage::Join { .. } => "join",
            PeerMessage::Leave { .. } => "leave",
            PeerMessage::State { .. } => "state",
            PeerMessage::Spawn { .. } => "spawn",
            PeerMessage::PowerSpawn { .. } => "powerSpawn",
            PeerMessage::Pickup { .. } => "pickup",
            PeerMessage::Shoot { .. } => "shoot",
            PeerMessage::Start { .. } => "start",
        }
    }
}
