// Domain-level errors for establishing a room connection.

use std::fmt;

/// Failure to establish a room channel at initial connect or on reconnect.
#[derive(Debug)]
pub enum ConnectionError {
    // Negotiation endpoint unreachable or returned an unreadable body.
    Negotiate(String),
    // Negotiation endpoint answered with a non-2xx status.
    NegotiateStatus(u16),
    // Negotiation succeeded but did not hand out a connection url.
    MissingUrl,
    InvalidUrl(String),
    // Relay websocket could not be opened or dropped during the handshake.
    Relay(String),
    // Relay accepted the socket but never completed the websocket upgrade.
    HandshakeTimeout,
    // Relay refused the group join.
    JoinRejected(String),
    JoinTimeout,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Negotiate(err) => write!(f, "negotiate failed: {err}"),
            ConnectionError::NegotiateStatus(status) => {
                write!(f, "negotiate failed with status {status}")
            }
            ConnectionError::MissingUrl => write!(f, "negotiate response has no url"),
            ConnectionError::InvalidUrl(url) => write!(f, "invalid relay url: {url}"),
            ConnectionError::Relay(err) => write!(f, "relay connection failed: {err}"),
            ConnectionError::HandshakeTimeout => write!(f, "relay handshake timed out"),
            ConnectionError::JoinRejected(reason) => write!(f, "relay rejected join: {reason}"),
            ConnectionError::JoinTimeout => write!(f, "relay join timed out"),
        }
    }
}

impl std::error::Error for ConnectionError {}
