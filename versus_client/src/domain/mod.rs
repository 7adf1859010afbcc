// Domain layer: identities, message vocabulary, time conversion and ports.

pub mod clock;
pub mod errors;
pub mod messages;
pub mod notices;
pub mod ports;
pub mod state;
pub mod tuning;

pub use errors::ConnectionError;
pub use messages::PeerMessage;
pub use notices::SessionNotice;
pub use ports::{
    Clock, Connector, Link, LocalEvent, Playfield, Scene, TransportKind, WorldSink,
};
pub use state::{
    Freshness, ObstacleSpawn, PeerId, Phase, PlayerSnapshot, Pose, PowerKind, PowerSpawn,
    ProjectileSpawn, Role, RoomCode, RoomCodeError, SessionState, StartSignal, WorldEvent,
    elect_role,
};
pub use tuning::{FlightTuning, SpawnTuning};
