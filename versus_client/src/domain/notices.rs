// User-visible notices and cues the session surfaces to the host scene.

use super::ports::TransportKind;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    Connected { transport: TransportKind },
    // Initial connect failed; the match never starts.
    ConnectionFailed { reason: String },
    OpponentJoined { name: Option<String> },
    OpponentLeft,
    // Whole seconds remaining changed during the countdown (audio cue hook).
    CountdownTick { seconds: u32 },
    Go,
    Disconnected,
    Reconnecting { attempt: u32 },
    Reconnected,
    // A reconnection attempt failed; distinct from an initial connect failure.
    ReconnectFailed { attempt: u32, reason: String },
    // Retry budget exhausted; play continues locally.
    Degraded,
}

impl SessionNotice {
    /// Short text the host can show as a toast.
    pub fn text(&self) -> String {
        match self {
            SessionNotice::Connected { transport } => {
                format!("Connected ({})", transport.as_str().to_uppercase())
            }
            SessionNotice::ConnectionFailed { .. } => "Online: failed to connect".to_string(),
            SessionNotice::OpponentJoined { name } => {
                format!("{} joined", name.as_deref().unwrap_or("Opponent"))
            }
            SessionNotice::OpponentLeft => "Opponent left".to_string(),
            SessionNotice::CountdownTick { seconds } => seconds.to_string(),
            SessionNotice::Go => "GO!".to_string(),
            SessionNotice::Disconnected => "Online: disconnected".to_string(),
            SessionNotice::Reconnecting { attempt } => {
                format!("Online: reconnecting (attempt {attempt})")
            }
            SessionNotice::Reconnected => "Online: reconnected".to_string(),
            SessionNotice::ReconnectFailed { .. } => "Online: reconnect failed".to_string(),
            SessionNotice::Degraded => "Online: playing offline".to_string(),
        }
    }
}
