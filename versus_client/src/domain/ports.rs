// Ports the synchronization core consumes; adapters and the host implement them.

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use super::errors::ConnectionError;
use super::messages::PeerMessage;
use super::notices::SessionNotice;
use super::state::{ObstacleSpawn, Pose, PowerSpawn, ProjectileSpawn, RoomCode};

// Port for reading time. Monotonic time drives frames and buffers; epoch time
// is only used to reconcile the countdown start across machines.
pub trait Clock: Send + Sync {
    fn monotonic_ms(&self) -> f64;
    fn epoch_ms(&self) -> f64;
}

/// Local world model that leader-authoritative events are materialized into.
pub trait WorldSink {
    fn spawn_obstacle(&mut self, obstacle: &ObstacleSpawn);
    fn spawn_power_up(&mut self, power: &PowerSpawn);
    /// Removes a tracked power-up; returns false when it was already gone.
    fn remove_power_up(&mut self, pid: &str) -> bool;
    fn spawn_projectile(&mut self, projectile: &ProjectileSpawn);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playfield {
    pub width: f64,
    pub height: f64,
}

/// Something the local player did that the other peer needs to hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalEvent {
    Pickup { pid: String },
    Shot(ProjectileSpawn),
}

// Port for the host game scene: physics, rendering and UI stay outside the core.
pub trait Scene: WorldSink {
    fn playfield(&self) -> Playfield;
    /// Advances local physics; only called while the match is running.
    fn step(&mut self, dt: f64);
    fn local_pose(&self) -> Pose;
    fn apply_remote_pose(&mut self, pose: &Pose);
    fn drain_local_events(&mut self) -> Vec<LocalEvent>;
    fn notify(&mut self, notice: &SessionNotice);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Relay,
    Loopback,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Relay => "relay",
            TransportKind::Loopback => "loopback",
        }
    }
}

// Port for an established room channel.
pub trait Link: Send {
    /// Fire-and-forget; silently dropped when the link is down.
    fn send(&self, message: &PeerMessage);
    /// Each call returns an independent listener for transport-level drops.
    fn disconnected(&self) -> broadcast::Receiver<()>;
    fn kind(&self) -> TransportKind;
    fn close(&mut self);
}

// Port for opening room channels. Inbound messages are pushed into `inbound`
// from the moment the channel exists, before the group join is issued.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        room: &RoomCode,
        inbound: mpsc::UnboundedSender<PeerMessage>,
    ) -> Result<Box<dyn Link>, ConnectionError>;
}
