use crate::interface_adapters::handlers::{health, negotiate};
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::state::AppState;
use axum::{Router, routing::get};

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/negotiate", get(negotiate).post(negotiate))
        .route("/api/health", get(health))
        .route("/client", get(ws_handler))
        .with_state(state)
}
