// Interface adapters: wire protocol, HTTP handlers and websocket handling.

pub mod handlers;
pub mod net;
pub mod protocol;
pub mod routes;
pub mod state;
pub mod utils;
