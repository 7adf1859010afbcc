// Room transports: relay websocket, in-process loopback, and the connector choosing between them.

pub mod connector;
pub mod loopback;
pub mod relay;

pub use connector::{RoomConnector, is_local_host};
pub use loopback::{LoopbackBus, LoopbackLink};
pub use relay::RelayLink;
