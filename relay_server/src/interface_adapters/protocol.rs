use serde::{Deserialize, Serialize};
use serde_json::Value;

// Client -> relay frames on the websocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    JoinGroup {
        group: String,
        #[serde(default)]
        ack_id: Option<u64>,
    },
    LeaveGroup {
        group: String,
        #[serde(default)]
        ack_id: Option<u64>,
    },
    SendToGroup {
        group: String,
        data: Value,
        #[serde(default)]
        data_type: Option<String>,
        #[serde(default)]
        no_echo: bool,
        #[serde(default)]
        ack_id: Option<u64>,
    },
}

// Relay -> client frames on the websocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerFrame<'a> {
    Connected {
        connection_id: String,
    },
    Ack {
        ack_id: u64,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<&'static str>,
    },
    Message {
        from: &'static str,
        group: &'a str,
        data: &'a Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        data_type: Option<&'a str>,
    },
}

// Negotiation response: a pre-authenticated websocket URL.
#[derive(Debug, Serialize, Deserialize)]
pub struct NegotiateResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

// Shared HTTP error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
