// Interface adapters: wire protocol, negotiation client, transports and system clock.

pub mod clients;
pub mod clock;
pub mod protocol;
pub mod transport;
pub mod utils;
