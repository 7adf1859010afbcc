// Wire protocol DTOs exchanged between peers through the relay, one JSON object per message.
// Decoding is the single validation boundary: anything that gets past it is a typed PeerMessage.

use crate::domain::{
    ObstacleSpawn, PeerId, PeerMessage, PlayerSnapshot, PowerKind, PowerSpawn, ProjectileSpawn,
    RoomCode, StartSignal,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// Obstacle width when a spawn omits it.
const DEFAULT_OBSTACLE_WIDTH: f64 = 80.0;

/// Messages as they appear on the wire, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RtMessage {
    Join(JoinDto),
    Leave(LeaveDto),
    State(StateDto),
    Spawn(SpawnDto),
    PowerSpawn(PowerSpawnDto),
    Pickup(PickupDto),
    Shoot(ShootDto),
    Start(StartDto),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinDto {
    pub id: String,
    pub room_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveDto {
    pub id: String,
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDto {
    pub id: String,
    pub t: f64,
    pub x: f64,
    pub y: f64,
    pub vy: f64,
    pub score: f64,
    pub hp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnDto {
    pub id: String,
    pub t: f64,
    #[serde(default)]
    pub w: Option<f64>,
    pub gap: f64,
    pub top_h: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerKindDto {
    Heal,
    Shield,
    Rapid,
    Multishot,
    Bigshot,
    Slowmo,
    Magnet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerSpawnDto {
    pub id: String,
    pub t: f64,
    pub pid: String,
    pub kind: PowerKindDto,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupDto {
    pub id: String,
    pub t: f64,
    pub pid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShootDto {
    pub id: String,
    pub t: f64,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDto {
    pub id: String,
    pub room_id: String,
    pub t: f64,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_at: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub delay_ms: Option<f64>,
}

// Non-numeric timing fields read as absent so the start still falls back to its defaults.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| value.as_f64()))
}

#[derive(Debug)]
pub enum DecodeError {
    Json(serde_json::Error),
    MissingSender,
    MissingPid,
    InvalidRoom,
    NonFinite(&'static str),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Json(err) => write!(f, "invalid message json: {err}"),
            DecodeError::MissingSender => write!(f, "message has no sender id"),
            DecodeError::MissingPid => write!(f, "message has no power-up id"),
            DecodeError::InvalidRoom => write!(f, "message has an invalid room id"),
            DecodeError::NonFinite(field) => write!(f, "field `{field}` is not a finite number"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decodes one inbound text frame into a validated peer message.
pub fn decode(text: &str) -> Result<PeerMessage, DecodeError> {
    let raw = serde_json::from_str::<RtMessage>(text).map_err(DecodeError::Json)?;
    PeerMessage::try_from(raw)
}

/// Encodes one outbound peer message as a JSON text frame.
pub fn encode(message: &PeerMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(&RtMessage::from(message))
}

/// Decodes a message already parsed as JSON (relay frames embed it as `data`).
pub fn decode_value(value: serde_json::Value) -> Result<PeerMessage, DecodeError> {
    let raw = serde_json::from_value::<RtMessage>(value).map_err(DecodeError::Json)?;
    PeerMessage::try_from(raw)
}

fn finite(field: &'static str, value: f64) -> Result<f64, DecodeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DecodeError::NonFinite(field))
    }
}

fn sender(id: String) -> Result<PeerId, DecodeError> {
    if id.trim().is_empty() {
        return Err(DecodeError::MissingSender);
    }
    Ok(PeerId::new(id))
}

fn room(room_id: &str) -> Result<RoomCode, DecodeError> {
    RoomCode::parse(room_id).map_err(|_| DecodeError::InvalidRoom)
}

fn pid(pid: String) -> Result<String, DecodeError> {
    if pid.is_empty() {
        return Err(DecodeError::MissingPid);
    }
    Ok(pid)
}

fn non_empty(name: Option<String>) -> Option<String> {
    name.filter(|name| !name.trim().is_empty())
}

impl From<PowerKindDto> for PowerKind {
    fn from(kind: PowerKindDto) -> Self {
        match kind {
            PowerKindDto::Heal => PowerKind::Heal,
            PowerKindDto::Shield => PowerKind::Shield,
            PowerKindDto::Rapid => PowerKind::Rapid,
            PowerKindDto::Multishot => PowerKind::Multishot,
            PowerKindDto::Bigshot => PowerKind::Bigshot,
            PowerKindDto::Slowmo => PowerKind::Slowmo,
            PowerKindDto::Magnet => PowerKind::Magnet,
        }
    }
}

impl From<PowerKind> for PowerKindDto {
    fn from(kind: PowerKind) -> Self {
        match kind {
            PowerKind::Heal => PowerKindDto::Heal,
            PowerKind::Shield => PowerKindDto::Shield,
            PowerKind::Rapid => PowerKindDto::Rapid,
            PowerKind::Multishot => PowerKindDto::Multishot,
            PowerKind::Bigshot => PowerKindDto::Bigshot,
            PowerKind::Slowmo => PowerKindDto::Slowmo,
            PowerKind::Magnet => PowerKindDto::Magnet,
        }
    }
}

impl TryFrom<RtMessage> for PeerMessage {
    type Error = DecodeError;

    fn try_from(raw: RtMessage) -> Result<Self, Self::Error> {
        let message = match raw {
            RtMessage::Join(m) => PeerMessage::Join {
                room: room(&m.room_id)?,
                id: sender(m.id)?,
                name: non_empty(m.name),
            },
            RtMessage::Leave(m) => PeerMessage::Leave {
                room: room(&m.room_id)?,
                id: sender(m.id)?,
            },
            RtMessage::State(m) => {
                let score = finite("score", m.score)?.max(0.0).floor();
                let hp = finite("hp", m.hp)?.round();
                PeerMessage::State {
                    snapshot: PlayerSnapshot {
                        t: finite("t", m.t)?,
                        x: finite("x", m.x)?,
                        y: finite("y", m.y)?,
                        vy: finite("vy", m.vy)?,
                        score: score.min(u32::MAX as f64) as u32,
                        hp: hp.clamp(i32::MIN as f64, i32::MAX as f64) as i32,
                        name: non_empty(m.name),
                    },
                    id: sender(m.id)?,
                }
            }
            RtMessage::Spawn(m) => PeerMessage::Spawn {
                t: finite("t", m.t)?,
                obstacle: ObstacleSpawn {
                    w: finite("w", m.w.unwrap_or(DEFAULT_OBSTACLE_WIDTH))?,
                    gap: finite("gap", m.gap)?,
                    top_h: finite("topH", m.top_h)?,
                    speed: finite("speed", m.speed)?,
                },
                id: sender(m.id)?,
            },
            RtMessage::PowerSpawn(m) => PeerMessage::PowerSpawn {
                t: finite("t", m.t)?,
                power: PowerSpawn {
                    pid: pid(m.pid)?,
                    kind: m.kind.into(),
                    x: finite("x", m.x)?,
                    y: finite("y", m.y)?,
                    vx: finite("vx", m.vx)?,
                },
                id: sender(m.id)?,
            },
            RtMessage::Pickup(m) => PeerMessage::Pickup {
                t: finite("t", m.t)?,
                pid: pid(m.pid)?,
                id: sender(m.id)?,
            },
            RtMessage::Shoot(m) => PeerMessage::Shoot {
                t: finite("t", m.t)?,
                projectile: ProjectileSpawn {
                    x: finite("x", m.x)?,
                    y: finite("y", m.y)?,
                    vx: finite("vx", m.vx)?,
                    vy: finite("vy", m.vy)?,
                    // Optional cosmetics are dropped rather than rejected.
                    w: m.w.filter(|w| w.is_finite() && *w > 0.0),
                    h: m.h.filter(|h| h.is_finite() && *h > 0.0),
                    color: non_empty(m.color),
                },
                id: sender(m.id)?,
            },
            RtMessage::Start(m) => PeerMessage::Start {
                room: room(&m.room_id)?,
                signal: StartSignal {
                    t: finite("t", m.t)?,
                    start_at: m.start_at.filter(|v| v.is_finite()),
                    delay_ms: m.delay_ms.filter(|v| v.is_finite()),
                },
                id: sender(m.id)?,
            },
        };
        Ok(message)
    }
}

impl From<&PeerMessage> for RtMessage {
    fn from(message: &PeerMessage) -> Self {
        match message {
            PeerMessage::Join { id, room, name } => RtMessage::Join(JoinDto {
                id: id.to_string(),
                room_id: room.to_string(),
                name: name.clone(),
            }),
            PeerMessage::Leave { id, room } => RtMessage::Leave(LeaveDto {
                id: id.to_string(),
                room_id: room.to_string(),
            }),
            PeerMessage::State { id, snapshot } => RtMessage::State(StateDto {
                id: id.to_string(),
                t: snapshot.t,
                x: snapshot.x,
                y: snapshot.y,
                vy: snapshot.vy,
                score: f64::from(snapshot.score),
                hp: f64::from(snapshot.hp),
                name: snapshot.name.clone(),
            }),
            PeerMessage::Spawn { id, t, obstacle } => RtMessage::Spawn(SpawnDto {
                id: id.to_string(),
                t: *t,
                w: Some(obstacle.w),
                gap: obstacle.gap,
                top_h: obstacle.top_h,
                speed: obstacle.speed,
            }),
            PeerMessage::PowerSpawn { id, t, power } => RtMessage::PowerSpawn(PowerSpawnDto {
                id: id.to_string(),
                t: *t,
                pid: power.pid.clone(),
                kind: power.kind.into(),
                x: power.x,
                y: power.y,
                vx: power.vx,
            }),
            PeerMessage::Pickup { id, t, pid } => RtMessage::Pickup(PickupDto {
                id: id.to_string(),
                t: *t,
                pid: pid.clone(),
            }),
            PeerMessage::Shoot { id, t, projectile } => RtMessage::Shoot(ShootDto {
                id: id.to_string(),
                t: *t,
                x: projectile.x,
                y: projectile.y,
                vx: projectile.vx,
                vy: projectile.vy,
                w: projectile.w,
                h: projectile.h,
                color: projectile.color.clone(),
            }),
            PeerMessage::Start { id, room, signal } => RtMessage::Start(StartDto {
                id: id.to_string(),
                room_id: room.to_string(),
                t: signal.t,
                start_at: signal.start_at,
                delay_ms: signal.delay_ms,
            }),
        }
    }
}
